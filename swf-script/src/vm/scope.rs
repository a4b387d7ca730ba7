use std::collections::HashMap;

use crate::variant::Value;

/// Variables, operand stack and constant table of one activation.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub vars: HashMap<String, Value>,
    pub stack: Vec<Value>,
    pub constants: Vec<String>,
}

/// The global frame plus the stack of function activations above it.
///
/// The innermost frame is the last element of `frames`, or `global` when no
/// call is active. Lookups walk from the innermost frame outward.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    global: Frame,
    frames: Vec<Frame>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active calls above global.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn global(&self) -> &Frame {
        &self.global
    }

    pub fn current(&self) -> &Frame {
        self.frames.last().unwrap_or(&self.global)
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.global,
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Drop the innermost activation. `None` at global scope.
    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    fn outward(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev().chain(std::iter::once(&self.global))
    }

    /// Resolve `name`, innermost first. Unknown names read as undefined.
    pub fn get(&self, name: &str) -> Value {
        self.outward()
            .find_map(|frame| frame.vars.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.current_mut().vars.insert(name.into(), value);
    }

    /// Overwrite the nearest definition of `name`, or create it on global.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let frame = match self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.vars.contains_key(&name))
        {
            Some(frame) => frame,
            None => &mut self.global,
        };
        frame.vars.insert(name, value);
    }

    pub fn push(&mut self, value: Value) {
        self.current_mut().stack.push(value);
    }

    /// Pop from the current operand stack; an empty stack yields undefined.
    pub fn pop(&mut self) -> Value {
        self.current_mut().stack.pop().unwrap_or_default()
    }

    pub fn stack(&self) -> &[Value] {
        &self.current().stack
    }

    pub fn set_constants(&mut self, constants: Vec<String>) {
        self.current_mut().constants = constants;
    }

    pub fn constants(&self) -> &[String] {
        &self.current().constants
    }
}
