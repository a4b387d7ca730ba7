use std::rc::Rc;

use swf_core::data;
use swf_nls::TextDecoder;

use super::{action::Action, Interpreter, VmError};
use crate::variant::{Function, Value};

const PUSH_TEXT: u8 = 0;
const PUSH_BOOL: u8 = 5;
const PUSH_FLOAT: u8 = 6;
const PUSH_INT: u8 = 7;

fn binary(vm: &mut Interpreter, op: fn(&Value, &Value) -> Value) -> Result<(), VmError> {
    let a = vm.scope.pop();
    let b = vm.scope.pop();
    vm.scope.push(op(&a, &b));
    Ok(())
}

pub(super) fn add(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    binary(vm, |a, b| a.add(b))
}

pub(super) fn subtract(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    binary(vm, |a, b| b.sub(a))
}

pub(super) fn multiply(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    binary(vm, |a, b| a.mul(b))
}

pub(super) fn modulo(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    binary(vm, |x, y| y.rem(x))
}

pub(super) fn equals(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    binary(vm, |a, b| Value::Bool(a.loose_eq(b)))
}

pub(super) fn not(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    let v = vm.scope.pop();
    vm.scope.push(Value::Bool(!v.truthy()));
    Ok(())
}

pub(super) fn get_variable(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    let name = vm.scope.pop().to_text();
    let value = vm.scope.get(&name);
    vm.scope.push(value);
    Ok(())
}

pub(super) fn set_variable(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    let value = vm.scope.pop();
    let name = vm.scope.pop().to_text();
    vm.scope.assign(name, value);
    Ok(())
}

pub(super) fn define_local(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    let value = vm.scope.pop();
    let name = vm.scope.pop().to_text();
    vm.scope.define(name, value);
    Ok(())
}

pub(super) fn call_function(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    let name = vm.scope.pop();
    let argc = vm.scope.pop().to_number();
    let argc = if argc.is_finite() && argc > 0.0 { argc as usize } else { 0 };
    // args past the end of the stack would pop as undefined, same as a missing arg
    let argc = argc.min(vm.scope.stack().len());
    let args: Vec<Value> = (0..argc).map(|_| vm.scope.pop()).collect();

    let (name, func) = match name {
        Value::Function(f) => (String::new(), f),
        other => {
            let name = other.to_text();
            match vm.scope.get(&name) {
                Value::Function(f) => (name, f),
                _ => {
                    return Err(VmError::NotCallable {
                        name,
                        pc: vm.action_pc,
                    })
                }
            }
        }
    };

    log::trace!("call {:?} -> 0x{:X} ({} args)", name, func.entry, args.len());

    vm.scope.push_frame();
    vm.calls.push(vm.pc);
    if !name.is_empty() {
        vm.scope.define(name, Value::Function(func.clone()));
    }
    let mut args = args.into_iter();
    for param in &func.params {
        vm.scope.define(param.clone(), args.next().unwrap_or_default());
    }
    vm.pc = func.entry;
    Ok(())
}

pub(super) fn return_(vm: &mut Interpreter, _: &Action<'_>) -> Result<(), VmError> {
    let value = vm.scope.pop();
    if vm.scope.pop_frame().is_none() {
        return Err(VmError::ScopeUnderflow { pc: vm.action_pc });
    }
    vm.scope.push(value);
    vm.pc = vm
        .calls
        .pop()
        .ok_or(VmError::CallStackUnderflow { pc: vm.action_pc })?;
    Ok(())
}

fn read_string(vm: &Interpreter, operand: &[u8], off: &mut usize) -> Result<String, VmError> {
    let raw = data::read_cstr(operand, off).map_err(|e| vm.data_err(e))?;
    Ok(vm.nls.decode(raw).into_owned())
}

pub(super) fn constant_pool(vm: &mut Interpreter, action: &Action<'_>) -> Result<(), VmError> {
    let operand = action.operand();
    let mut off = 0;
    let count = data::read_u16(operand, &mut off).map_err(|e| vm.data_err(e))?;
    let mut constants = Vec::with_capacity(count as usize);
    for _ in 0..count {
        constants.push(read_string(vm, operand, &mut off)?);
    }
    vm.scope.set_constants(constants);
    Ok(())
}

pub(super) fn push(vm: &mut Interpreter, action: &Action<'_>) -> Result<(), VmError> {
    let operand = action.operand();
    let mut off = 0;
    while off < operand.len() {
        let ty = operand[off];
        off += 1;
        let value = match ty {
            PUSH_TEXT => Value::Text(read_string(vm, operand, &mut off)?),
            PUSH_BOOL => {
                Value::Bool(data::read_u8(operand, &mut off).map_err(|e| vm.data_err(e))? != 0)
            }
            PUSH_FLOAT => {
                Value::Float(data::read_f64(operand, &mut off).map_err(|e| vm.data_err(e))?)
            }
            PUSH_INT => Value::Int(data::read_i32(operand, &mut off).map_err(|e| vm.data_err(e))?),
            _ => {
                return Err(VmError::UnknownPushType {
                    ty,
                    pc: vm.action_pc,
                })
            }
        };
        vm.scope.push(value);
    }
    Ok(())
}

pub(super) fn define_function(vm: &mut Interpreter, action: &Action<'_>) -> Result<(), VmError> {
    let operand = action.operand();
    let mut off = 0;
    let name = read_string(vm, operand, &mut off)?;
    let count = data::read_u16(operand, &mut off).map_err(|e| vm.data_err(e))?;
    let mut params = Vec::with_capacity(count as usize);
    for _ in 0..count {
        params.push(read_string(vm, operand, &mut off)?);
    }
    let body = data::read_u16(operand, &mut off).map_err(|e| vm.data_err(e))?;

    let func = Rc::new(Function {
        name: name.clone(),
        params,
        entry: vm.pc,
    });
    if name.is_empty() {
        vm.scope.push(Value::Function(func));
    } else {
        vm.scope.define(name, Value::Function(func));
    }
    vm.pc += body as usize;
    Ok(())
}

pub(super) fn jump(vm: &mut Interpreter, action: &Action<'_>) -> Result<(), VmError> {
    let offset = action.branch_offset().map_err(|e| vm.data_err(e))?;
    vm.branch(offset)
}

pub(super) fn if_(vm: &mut Interpreter, action: &Action<'_>) -> Result<(), VmError> {
    let offset = action.branch_offset().map_err(|e| vm.data_err(e))?;
    if vm.scope.pop().truthy() {
        vm.branch(offset)?;
    }
    Ok(())
}
