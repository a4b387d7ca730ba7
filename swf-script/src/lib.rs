//! swf-script
//!
//! Decoding of AVM1 action records and a small interpreter built for tracing
//! control flow through obfuscated bytecode. It evaluates just enough of the
//! language to follow setup code and jump chains; it is not a player.

pub mod variant;
pub mod vm;

pub use variant::{Function, Value};
pub use vm::{
    action::Action, dispatch::DispatchTable, opcode::Opcode, scope::ScopeChain, Interpreter,
    VmError,
};
