use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use swf_nls::Decoder;
use swf_script::{Interpreter, Opcode, VmError};

use crate::splice::{splice, SpliceError};

/// Two five-byte jumps.
const JUMP_PAIR_SIZE: usize = 10;
const JUMP_SIZE: usize = 5;

pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entry,
    StartJumps,
    EndJumps,
    Tail,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Entry => "tracing the entry point",
            Phase::StartJumps => "tracing start jumps",
            Phase::EndJumps => "tracing end jumps",
            Phase::Tail => "running to the end",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error(transparent)]
    Vm(#[from] VmError),

    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error("code ended while {phase}")]
    EndOfStream { phase: Phase },

    #[error("jump chain revisits 0x{pc:X}")]
    JumpCycle { pc: usize },

    #[error("jump landing at 0x{pc:X} cannot follow a jump pair")]
    BadPair { pc: usize },

    #[error("failed to locate packed code end")]
    BodyEndNotFound,

    #[error("packed code ends at 0x{end:X} before it starts at 0x{start:X}")]
    InvertedBody { start: usize, end: usize },

    #[error("unexpected code end location: 0x{actual:X}, expected 0x{expected:X}")]
    EndMismatch { expected: usize, actual: usize },

    #[error("gave up after {limit} steps while {phase}")]
    StepLimit { limit: u64, phase: Phase },
}

/// One recovered code region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// constant pool + cleaned body + end action
    pub code: Bytes,
    pub entry: usize,
    pub body_start: usize,
    pub body_end: usize,
    pub jump_pairs: Vec<usize>,
    pub constant_pool: Option<Bytes>,
    pub steps: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Tracer {
    pub nls: Decoder,
    pub step_limit: u64,
}

impl Default for Tracer {
    fn default() -> Self {
        Self {
            nls: Decoder::default(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

impl Tracer {
    pub fn new(nls: Decoder, step_limit: u64) -> Self {
        Self { nls, step_limit }
    }

    fn step(&self, vm: &mut Interpreter, phase: Phase) -> Result<(), TraceError> {
        if vm.steps() >= self.step_limit {
            return Err(TraceError::StepLimit {
                limit: self.step_limit,
                phase,
            });
        }
        if !vm.step()? {
            return Err(TraceError::EndOfStream { phase });
        }
        Ok(())
    }

    /// Recover the code hidden in `data`.
    ///
    /// `before` is where the real tag starts (everything below belongs to the
    /// marker), `end` is where execution has to finish, and `entry` is where it
    /// starts.
    pub fn trace(
        &self,
        data: &Bytes,
        before: usize,
        end: usize,
        entry: usize,
    ) -> Result<Trace, TraceError> {
        let mut vm = Interpreter::new(data.clone(), entry).with_decoder(self.nls);

        // run the setup code until control drops back into the marker
        let mut constant_pool = None;
        loop {
            let pc = vm.pc();
            let action = vm.next_action()?;
            if action.code == Opcode::ConstantPool as u8 {
                constant_pool = Some(data.slice(pc..pc + action.size));
            }
            self.step(&mut vm, Phase::Entry)?;
            if vm.pc() < before {
                break;
            }
        }
        log::trace!("entry 0x{:X} lands at 0x{:X}", entry, vm.pc());

        // only jumps from here on
        vm.restrict_to(&[Opcode::Jump]);
        let mut jump_pairs = Vec::new();
        loop {
            let pc = vm.pc();
            let pair = pc.checked_sub(JUMP_SIZE).ok_or(TraceError::BadPair { pc })?;
            if jump_pairs.contains(&pair) {
                return Err(TraceError::JumpCycle { pc: pair });
            }
            jump_pairs.push(pair);
            self.step(&mut vm, Phase::StartJumps)?;
            log::trace!("jump pair 0x{:X} -> 0x{:X}", pair, vm.pc());
            if vm.next_opcode()? != Opcode::Jump as u8 {
                break;
            }
        }
        jump_pairs.sort_unstable();
        let body_start = vm.pc();

        // the pair that leads out, or into another pair, closes the body
        let mut body_end = None;
        for &pair in &jump_pairs {
            vm.set_pc(pair);
            self.step(&mut vm, Phase::EndJumps)?;
            if vm.pc() >= before || jump_pairs.binary_search(&vm.pc()).is_ok() {
                body_end = Some(pair);
                break;
            }
        }
        let body_end = body_end.ok_or(TraceError::BodyEndNotFound)?;
        if body_end < body_start {
            return Err(TraceError::InvertedBody {
                start: body_start,
                end: body_end,
            });
        }

        vm.restore_dispatch();
        vm.set_pc(body_end);
        loop {
            if vm.steps() >= self.step_limit {
                return Err(TraceError::StepLimit {
                    limit: self.step_limit,
                    phase: Phase::Tail,
                });
            }
            if !vm.step()? {
                break;
            }
        }
        if vm.pc() != end {
            return Err(TraceError::EndMismatch {
                expected: end,
                actual: vm.pc(),
            });
        }

        let mut body = data.slice(body_start..body_end);
        for &pair in jump_pairs.iter().rev() {
            if pair >= body_start && pair < body_end {
                body = splice(&body, pair - body_start, JUMP_PAIR_SIZE, None)?;
            }
        }

        let pool_len = constant_pool.as_ref().map_or(0, |p: &Bytes| p.len());
        let mut code = BytesMut::with_capacity(pool_len + body.len() + 1);
        if let Some(pool) = &constant_pool {
            code.put_slice(pool);
        }
        code.put_slice(&body);
        code.put_u8(0);

        log::debug!(
            "region 0x{:X}: body 0x{:X}..0x{:X}, {} jump pairs, {} bytes recovered",
            entry,
            body_start,
            body_end,
            jump_pairs.len(),
            code.len()
        );

        Ok(Trace {
            code: code.freeze(),
            entry,
            body_start,
            body_end,
            jump_pairs,
            constant_pool,
            steps: vm.steps(),
        })
    }
}
