pub mod action;
pub mod dispatch;
mod handlers;
pub mod opcode;
pub mod scope;

use bytes::Bytes;
use swf_core::DataError;
use swf_nls::Decoder;

use action::Action;
use dispatch::{DispatchTable, Slot};
use opcode::Opcode;
use scope::ScopeChain;

#[derive(thiserror::Error, Debug)]
pub enum VmError {
    #[error("malformed action at pc=0x{pc:X}: {source}")]
    Data { source: DataError, pc: usize },

    #[error("unknown opcode: 0x{opcode:02X} at pc=0x{pc:X}")]
    UnknownOpcode { opcode: u8, pc: usize },

    #[error("opcode 0x{opcode:02X} at pc=0x{pc:X} is disabled for this run")]
    ForbiddenOpcode { opcode: u8, pc: usize },

    #[error("unknown push type: {ty} at pc=0x{pc:X}")]
    UnknownPushType { ty: u8, pc: usize },

    #[error("{name:?} is not a function (pc=0x{pc:X})")]
    NotCallable { name: String, pc: usize },

    #[error("call stack underflow at pc=0x{pc:X}")]
    CallStackUnderflow { pc: usize },

    #[error("return at global scope, pc=0x{pc:X}")]
    ScopeUnderflow { pc: usize },

    #[error("branch at pc=0x{pc:X} targets {target}")]
    BadBranch { pc: usize, target: i64 },
}

/// Interpreter over one code buffer.
///
/// `step` runs a single action. Handlers are looked up in a [`DispatchTable`]
/// that can be narrowed mid-run, which is how jump chains get traced without
/// executing anything else.
pub struct Interpreter {
    code: Bytes,
    pc: usize,
    /// pc of the action being executed, for error reporting
    action_pc: usize,
    calls: Vec<usize>,
    scope: ScopeChain,
    dispatch: DispatchTable,
    nls: Decoder,
    steps: u64,
}

impl Interpreter {
    pub fn new(code: Bytes, entry: usize) -> Self {
        Self {
            code,
            pc: entry,
            action_pc: entry,
            calls: Vec::new(),
            scope: ScopeChain::new(),
            dispatch: DispatchTable::full(),
            nls: Decoder::default(),
            steps: 0,
        }
    }

    pub fn with_decoder(mut self, nls: Decoder) -> Self {
        self.nls = nls;
        self
    }

    pub fn code(&self) -> &Bytes {
        &self.code
    }

    #[inline]
    pub fn pc(&self) -> usize {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    /// Actions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn scope(&self) -> &ScopeChain {
        &self.scope
    }

    pub fn call_depth(&self) -> usize {
        self.calls.len()
    }

    /// Keep only `allowed` live; other implemented opcodes become forbidden.
    pub fn restrict_to(&mut self, allowed: &[Opcode]) {
        self.dispatch = DispatchTable::full().restrict_to(allowed);
    }

    pub fn restore_dispatch(&mut self) {
        self.dispatch = DispatchTable::full();
    }

    /// Raw opcode byte at the current pc.
    pub fn next_opcode(&self) -> Result<u8, VmError> {
        self.code.get(self.pc).copied().ok_or(VmError::Data {
            source: DataError::Truncated {
                offset: self.pc,
                needed: 1,
                available: 0,
            },
            pc: self.pc,
        })
    }

    /// Decode the action at the current pc without moving it.
    pub fn next_action(&self) -> Result<Action<'_>, VmError> {
        Action::decode(&self.code, self.pc).map_err(|source| VmError::Data {
            source,
            pc: self.pc,
        })
    }

    /// Run one action. Returns `false` once the end action has been consumed.
    pub fn step(&mut self) -> Result<bool, VmError> {
        let code = self.code.clone();
        let pc = self.pc;
        let action = Action::decode(&code, pc).map_err(|source| VmError::Data { source, pc })?;
        if action.is_end() {
            self.pc = pc + action.size;
            return Ok(false);
        }

        match self.dispatch.slot(action.code) {
            Slot::Live(handler) => {
                self.pc = pc + action.size;
                self.action_pc = pc;
                handler(self, &action)?;
                self.steps += 1;
                Ok(true)
            }
            Slot::Forbidden => Err(VmError::ForbiddenOpcode {
                opcode: action.code,
                pc,
            }),
            Slot::Unimplemented => Err(VmError::UnknownOpcode {
                opcode: action.code,
                pc,
            }),
        }
    }

    /// Move the pc by `offset` relative to its current (post-action) value.
    fn branch(&mut self, offset: i16) -> Result<(), VmError> {
        let target = self.pc as i64 + offset as i64;
        if target < 0 {
            return Err(VmError::BadBranch {
                pc: self.action_pc,
                target,
            });
        }
        self.pc = target as usize;
        Ok(())
    }

    fn data_err(&self, source: DataError) -> VmError {
        VmError::Data {
            source,
            pc: self.action_pc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Value;
    use pretty_assertions::assert_eq;

    fn run(hex_code: &str) -> Interpreter {
        let mut vm = Interpreter::new(Bytes::from(hex::decode(hex_code).unwrap()), 0);
        while vm.step().unwrap() {}
        vm
    }

    #[test]
    fn subtract_and_modulo_order() {
        // push 10, 3; subtract -> 10 - 3
        let vm = run(concat!("960a00", "070a000000", "0703000000", "0b", "00"));
        assert_eq!(vm.scope().stack(), &[Value::Int(7)]);

        // push 10, 3; modulo -> 10 mod 3
        let vm = run(concat!("960a00", "070a000000", "0703000000", "3f", "00"));
        assert_eq!(vm.scope().stack(), &[Value::Int(1)]);
    }

    #[test]
    fn add_concatenates_first_popped_first() {
        // push "a", "b"; add2 -> "b" + "a"
        let vm = run(concat!("960600", "006100", "006200", "47", "00"));
        assert_eq!(vm.scope().stack(), &[Value::text("ba")]);
    }

    #[test]
    fn push_literals() {
        let vm = run(concat!(
            "961300",
            "007800",
            "0501",
            "06000000000000f83f",
            "07ffffffff",
            "00"
        ));
        assert_eq!(
            vm.scope().stack(),
            &[
                Value::text("x"),
                Value::Bool(true),
                Value::Float(1.5),
                Value::Int(-1)
            ]
        );
    }

    #[test]
    fn variables() {
        let vm = run(concat!(
            // a = 5
            "960800", "006100", "0705000000", "1d",
            // push a, push b
            "960300", "006100", "1c",
            "960300", "006200", "1c",
            "00"
        ));
        assert_eq!(vm.scope().stack(), &[Value::Int(5), Value::Undefined]);
        assert_eq!(vm.scope().global().vars.len(), 1);
    }

    #[test]
    fn end_consumes_terminator() {
        let mut vm = Interpreter::new(Bytes::from_static(&[0x12, 0x00]), 0);
        assert!(vm.step().unwrap());
        assert_eq!(vm.scope().stack(), &[Value::Bool(true)]);
        assert!(!vm.step().unwrap());
        assert_eq!(vm.pc(), 2);
    }

    #[test]
    fn call_and_return() -> Result<(), VmError> {
        let code = hex::decode(concat!(
            // push "f"
            "960300", "006600",
            // function () { push 7; return }
            "9b0500", "00", "0000", "0900",
            "960500", "0707000000", "3e",
            // define local
            "3c",
            // push 0, "f"; call
            "960800", "0700000000", "006600",
            "3d",
            "00"
        ))
        .unwrap();
        let mut vm = Interpreter::new(Bytes::from(code), 0);
        while vm.step()? {}
        assert_eq!(vm.scope().stack(), &[Value::Int(7)]);
        assert_eq!(vm.scope().depth(), 0);
        assert_eq!(vm.call_depth(), 0);
        assert_eq!(vm.pc(), 37);
        let f = vm.scope().get("f");
        assert_eq!(f.as_function().map(|f| f.entry), Some(14));
        Ok(())
    }

    #[test]
    fn call_binds_params() -> Result<(), VmError> {
        let code = hex::decode(concat!(
            // function g(x) { push x; getvariable; return }
            "9b0800", "6700", "0100", "7800", "0800",
            "960300", "007800", "1c", "3e",
            // push 4, 1, "g"; call
            "960d00", "0704000000", "0701000000", "006700",
            "3d",
            "00"
        ))
        .unwrap();
        let mut vm = Interpreter::new(Bytes::from(code), 0);
        while vm.step()? {}
        assert_eq!(vm.scope().stack(), &[Value::Int(4)]);
        assert_eq!(vm.scope().get("x"), Value::Undefined);
        Ok(())
    }

    #[test]
    fn call_non_function() {
        let code = hex::decode(concat!("960800", "0700000000", "006800", "3d", "00")).unwrap();
        let mut vm = Interpreter::new(Bytes::from(code), 0);
        assert!(vm.step().unwrap());
        assert!(matches!(
            vm.step(),
            Err(VmError::NotCallable { ref name, pc: 11 }) if name == "h"
        ));
    }

    #[test]
    fn return_at_global() {
        let mut vm = Interpreter::new(Bytes::from_static(&[0x3e, 0x00]), 0);
        assert!(matches!(vm.step(), Err(VmError::ScopeUnderflow { pc: 0 })));
    }

    #[test]
    fn forbidden_is_not_unknown() {
        let mut vm = Interpreter::new(Bytes::from_static(&[0x12, 0x00]), 0);
        vm.restrict_to(&[Opcode::Jump]);
        assert!(matches!(
            vm.step(),
            Err(VmError::ForbiddenOpcode { opcode: 0x12, pc: 0 })
        ));

        let mut vm = Interpreter::new(Bytes::from_static(&[0x01, 0x00]), 0);
        assert!(matches!(
            vm.step(),
            Err(VmError::UnknownOpcode { opcode: 0x01, pc: 0 })
        ));

        let mut vm = Interpreter::new(Bytes::from_static(&[0x12, 0x00]), 0);
        vm.restrict_to(&[Opcode::Jump]);
        vm.restore_dispatch();
        assert!(vm.step().unwrap());
    }

    #[test]
    fn unknown_push_type() {
        let mut vm = Interpreter::new(Bytes::from(hex::decode("9602000400").unwrap()), 0);
        assert!(matches!(
            vm.step(),
            Err(VmError::UnknownPushType { ty: 4, pc: 0 })
        ));
    }

    #[test]
    fn jumps_and_branches() {
        // push true; if +1 skips the Not
        let vm = run(concat!("960200", "0501", "9d0200", "0100", "12", "00"));
        assert_eq!(vm.scope().stack(), &[] as &[Value]);

        let mut vm = Interpreter::new(Bytes::from(hex::decode("990200f0ff00").unwrap()), 0);
        assert!(matches!(
            vm.step(),
            Err(VmError::BadBranch { pc: 0, target: -11 })
        ));
    }
}
