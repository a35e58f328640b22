//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use std::io::Write;
use crate::config::MachineConfig;
use crate::vm::{History, Registers, Tape};
use crate::vm::decode::{self, Instruction, OpInfo, Op, Operand, Row};
use crate::vm::history::{HistoryEntry, WriteEffect};
use crate::vm::memory::MemoryError;
use crate::vm::registers::PageOffsets;
use crate::word::{arith, ArithError, BinaryOp, Width};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exit {
    /// An `END` instruction executed.
    Halted,
    /// Control moved to an address outside the tape.
    FellOff(i64),
    /// The configured step ceiling was reached.
    StepLimit,
}

/// Outcome of a single [`Engine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// `ip` now points at the next row.
    Continue,
    /// The run is over.
    Stop(Exit),
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Instructions executed.
    pub steps: u64,
    pub exit: Exit,
}

/// The virtual machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Engine {
    /// Program and data memory.
    pub tape: Tape,
    /// `ip`, `next` and page offsets.
    pub regs: Registers,
    history: History,
    config: MachineConfig,
    steps: u64,
}

impl Engine {
    /// Create an engine with the default 4096-cell tape.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    /// Create an engine with the given geometry and limits. The config is
    /// taken as-is; call [`MachineConfig::validate`] first if it came from
    /// outside.
    pub fn with_config(config: MachineConfig) -> Self {
        let mut regs = Registers::new();
        regs.reset(config.entry);
        Self {
            tape: Tape::new(config.capacity, config.overflow),
            regs,
            history: History::new(),
            config,
            steps: 0,
        }
    }

    /// Load a program image at address 0.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        self.tape.load(image)
    }

    /// Clear the tape, registers and history.
    pub fn reset(&mut self) {
        self.tape.clear();
        self.regs.reset(self.config.entry);
        self.history.clear();
        self.steps = 0;
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Trace of the most recent rows.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Instructions executed in the current run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run from the configured entry point.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<RunSummary, TapeError> {
        self.run_from(self.config.entry, out)
    }

    /// Run from `entry` until halt, fall-off, step ceiling, or fault.
    ///
    /// Page offsets and history start fresh; the tape is kept.
    pub fn run_from<W: Write>(&mut self, entry: usize, out: &mut W) -> Result<RunSummary, TapeError> {
        self.regs.reset(entry);
        self.history.clear();
        self.steps = 0;
        log::debug!("run: entry={:04} capacity={} policy={:?}", entry, self.tape.capacity(), self.tape.policy());

        loop {
            if let Some(limit) = self.config.max_steps {
                if self.steps >= limit {
                    log::warn!("step limit of {} reached at ip={:04}", limit, self.regs.ip);
                    return Ok(self.summary(Exit::StepLimit));
                }
            }

            if let Flow::Stop(exit) = self.step(out)? {
                log::debug!("stopped after {} steps: {:?}", self.steps, exit);
                return Ok(self.summary(exit));
            }
        }
    }

    /// Execute the row at `ip` and move to `next`.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Flow, TapeError> {
        let ip = self.regs.ip;
        if let Err(fault) = self.execute(ip, out) {
            log::debug!("fault at ip={:04}: {}", ip, fault);
            return Err(TapeError {
                fault,
                ip,
                history: self.history.snapshot(),
            });
        }
        self.steps += 1;

        let next = self.regs.next;
        if self.regs.is_halted() {
            return Ok(Flow::Stop(Exit::Halted));
        }
        if !self.tape.contains(next) {
            return Ok(Flow::Stop(Exit::FellOff(next)));
        }
        self.regs.ip = next as usize;
        Ok(Flow::Continue)
    }

    fn summary(&self, exit: Exit) -> RunSummary {
        RunSummary { steps: self.steps, exit }
    }

    /// Fetch, record and dispatch one row.
    fn execute<W: Write>(&mut self, ip: usize, out: &mut W) -> Result<(), Fault> {
        let row = Row::from_slice(self.tape.bytes(ip as i64, Row::SIZE)?);
        self.regs.advance();
        self.history.record(ip, row);
        log::trace!("{:04} {}", ip, row);

        let instr = decode::decode(row)
            .map_err(|_| Fault::InvalidOpcode { address: ip, row })?;

        match instr.opcode.op {
            Op::Nop => {}

            Op::Add => self.binary(BinaryOp::Add, &instr)?,
            Op::Sub => self.binary(BinaryOp::Sub, &instr)?,
            Op::Mul => self.binary(BinaryOp::Mul, &instr)?,
            Op::Div => self.binary(BinaryOp::Div, &instr)?,
            Op::Mod => self.binary(BinaryOp::Mod, &instr)?,
            Op::And => self.binary(BinaryOp::And, &instr)?,
            Op::Or => self.binary(BinaryOp::Or, &instr)?,
            Op::Xor => self.binary(BinaryOp::Xor, &instr)?,
            Op::Nor => self.binary(BinaryOp::Nor, &instr)?,

            Op::Not => {
                let info = instr.info();
                let width = instr.width();
                let value = self.load(info, 1, instr.b, width, true)?;
                self.store(info, 0, instr.a, arith::not(value), width)?;
            }

            Op::End => self.regs.halt(),

            Op::Prn => {
                let value = self.load(instr.info(), 0, instr.a, instr.width(), true)?;
                write!(out, "{}", value)?;
                out.flush()?;
            }

            Op::Prs => {
                let start = self.address(instr.info(), 0, instr.a);
                // Whole range is checked before anything is emitted.
                let bytes = self.tape.bytes(start, instr.b as usize)?;
                out.write_all(bytes)?;
                out.flush()?;
            }

            Op::Jmp => self.branch(&instr, |_| true)?,
            Op::Jz => self.branch(&instr, |cond| cond == 0)?,
            Op::Jnz => self.branch(&instr, |cond| cond != 0)?,
            Op::Js => self.branch(&instr, |cond| cond < 0)?,
            Op::Jns => self.branch(&instr, |cond| cond >= 0)?,

            Op::Pag => {
                self.regs.pages = PageOffsets::new(instr.a, instr.b, instr.c);
                log::debug!("pages set to {} at ip={:04}", self.regs.pages, ip);
            }
        }

        Ok(())
    }

    /// `write(A, read(B) <op> read(C))`.
    fn binary(&mut self, op: BinaryOp, instr: &Instruction) -> Result<(), Fault> {
        let info = instr.info();
        let width = instr.width();
        let lhs = self.load(info, 1, instr.b, width, true)?;
        let rhs = self.load(info, 2, instr.c, width, true)?;
        let value = arith::evaluate(op, lhs, rhs, self.tape.policy())?;
        self.store(info, 0, instr.a, value, width)
    }

    /// Conditional or unconditional jump.
    ///
    /// The condition is read through operand B. The target is loaded
    /// unsigned from the cell operand A names, then paged again through
    /// the table's resolve channel.
    fn branch(&mut self, instr: &Instruction, taken: impl Fn(i64) -> bool) -> Result<(), Fault> {
        let info = instr.info();
        let width = instr.width();

        let cond = match info.operands[1] {
            Operand::Source(_) => self.load(info, 1, instr.b, width, true)?,
            _ => 0,
        };
        if !taken(cond) {
            return Ok(());
        }

        let target = self.load(info, 0, instr.a, width, false)?;
        let target = match info.resolve {
            Some(channel) => self.regs.pages.translate(target, channel),
            None => target,
        };
        self.regs.jump(target);
        Ok(())
    }

    /// Effective address of operand `index`.
    fn address(&self, info: &OpInfo, index: usize, raw: u8) -> i64 {
        match info.operands[index] {
            Operand::Dest(channel) | Operand::Source(channel) => {
                self.regs.pages.translate(raw as i64, channel)
            }
            Operand::Literal | Operand::Unused => raw as i64,
        }
    }

    fn load(&self, info: &OpInfo, index: usize, raw: u8, width: Width, signed: bool) -> Result<i64, Fault> {
        let address = self.address(info, index, raw);
        Ok(self.tape.read(address, signed, width)?)
    }

    /// Write through operand `index` and record the effect in history.
    fn store(&mut self, info: &OpInfo, index: usize, raw: u8, value: i64, width: Width) -> Result<(), Fault> {
        let address = self.address(info, index, raw);
        let bytes = self.tape.write(address, value, width)?;
        self.history.attach_write(WriteEffect {
            address: address as usize,
            bytes,
        });
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("regs", &self.regs)
            .field("steps", &self.steps)
            .field("tape", &self.tape)
            .finish()
    }
}

/// A fatal condition raised by one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Fault {
    /// Tape access out of bounds, or a trapped overflow.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Division failure.
    #[error(transparent)]
    Arith(#[from] ArithError),

    /// The opcode byte names no instruction.
    #[error("invalid instruction: {address:04} {row}")]
    InvalidOpcode { address: usize, row: Row },

    /// The output sink rejected a print.
    #[error("output error: {0}")]
    Output(String),
}

impl From<std::io::Error> for Fault {
    fn from(e: std::io::Error) -> Self {
        Fault::Output(e.to_string())
    }
}

/// A fault together with where it happened and the trailing history.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("FATAL {fault} (ip={ip:04})")]
pub struct TapeError {
    pub fault: Fault,
    pub ip: usize,
    /// Most recent rows, oldest first. The faulting row is last unless the
    /// fault happened while fetching it.
    pub history: Vec<HistoryEntry>,
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::vm::history::HISTORY_CAPACITY;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn random_programs_never_panic(image in prop::collection::vec(any::<u8>(), 0..512)) {
            let mut engine = Engine::with_config(MachineConfig {
                capacity: 512,
                max_steps: Some(2000),
                ..MachineConfig::default()
            });
            engine.load_program(&image).unwrap();

            let mut out = Vec::new();
            match engine.run(&mut out) {
                Ok(summary) => prop_assert!(summary.steps <= 2000),
                Err(err) => prop_assert!(err.history.len() <= HISTORY_CAPACITY),
            }
            prop_assert!(engine.history().len() <= HISTORY_CAPACITY);
        }
    }
}
