use super::{action::Action, handlers, opcode::Opcode, Interpreter, VmError};

pub type Handler = fn(&mut Interpreter, &Action<'_>) -> Result<(), VmError>;

/// State of one opcode slot.
#[derive(Clone, Copy)]
pub enum Slot {
    /// no handler exists for this code
    Unimplemented,
    Live(Handler),
    /// a handler exists but is switched off for the current run
    Forbidden,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Unimplemented => f.write_str("Unimplemented"),
            Slot::Live(_) => f.write_str("Live"),
            Slot::Forbidden => f.write_str("Forbidden"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchTable {
    slots: [Slot; 256],
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self {
            slots: [Slot::Unimplemented; 256],
        }
    }

    /// Every handler the interpreter implements, all live.
    pub fn full() -> Self {
        let mut table = Self::empty();
        table.register(Opcode::Add, handlers::add);
        table.register(Opcode::Add2, handlers::add);
        table.register(Opcode::Subtract, handlers::subtract);
        table.register(Opcode::Multiply, handlers::multiply);
        table.register(Opcode::Modulo, handlers::modulo);
        table.register(Opcode::Equals, handlers::equals);
        table.register(Opcode::Not, handlers::not);
        table.register(Opcode::GetVariable, handlers::get_variable);
        table.register(Opcode::SetVariable, handlers::set_variable);
        table.register(Opcode::DefineLocal, handlers::define_local);
        table.register(Opcode::CallFunction, handlers::call_function);
        table.register(Opcode::Return, handlers::return_);
        table.register(Opcode::ConstantPool, handlers::constant_pool);
        table.register(Opcode::Push, handlers::push);
        table.register(Opcode::DefineFunction, handlers::define_function);
        table.register(Opcode::Jump, handlers::jump);
        table.register(Opcode::If, handlers::if_);
        table
    }

    pub fn register(&mut self, op: Opcode, handler: Handler) {
        self.slots[op as usize] = Slot::Live(handler);
    }

    #[inline]
    pub fn slot(&self, code: u8) -> Slot {
        self.slots[code as usize]
    }

    /// Copy of this table with every live handler outside `allowed` forbidden.
    pub fn restrict_to(&self, allowed: &[Opcode]) -> Self {
        let mut table = self.clone();
        for (code, slot) in table.slots.iter_mut().enumerate() {
            if matches!(slot, Slot::Live(_)) && !allowed.iter().any(|op| *op as usize == code) {
                *slot = Slot::Forbidden;
            }
        }
        table
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_slots() {
        let table = DispatchTable::full().restrict_to(&[Opcode::Jump]);
        assert!(matches!(table.slot(Opcode::Jump as u8), Slot::Live(_)));
        assert!(matches!(table.slot(Opcode::Push as u8), Slot::Forbidden));
        assert!(matches!(table.slot(Opcode::With as u8), Slot::Unimplemented));
        assert!(matches!(table.slot(0xFF), Slot::Unimplemented));
    }
}
