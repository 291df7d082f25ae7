//! Instruction dispatcher and the simulation context it drives.

use std::fmt;
use std::mem::size_of;

use log::{debug, trace};

use crate::constants::*;
use crate::error::SimError;
use crate::event::{Event, EventSink};
use crate::fault::FaultHandler;
use crate::memory::{Memory, Process, Pte};
use crate::pager::Pager;

/// One line of the instruction trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Read(usize),
    Write(usize),
    ContextSwitch(usize),
    Exit(usize),
}

impl Instruction {
    pub fn operation(&self) -> char {
        match self {
            Instruction::Read(_) => 'r',
            Instruction::Write(_) => 'w',
            Instruction::ContextSwitch(_) => 'c',
            Instruction::Exit(_) => 'e',
        }
    }

    pub fn operand(&self) -> usize {
        match *self {
            Instruction::Read(n)
            | Instruction::Write(n)
            | Instruction::ContextSwitch(n)
            | Instruction::Exit(n) => n,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation(), self.operand())
    }
}

/// Whole-run totals reported after the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub instructions: u64,
    pub context_switches: u64,
    pub process_exits: u64,
    pub cost: u64,
    pub pte_size: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TOTALCOST {} {} {} {} {}",
            self.instructions, self.context_switches, self.process_exits, self.cost, self.pte_size
        )
    }
}

/// Simulation context: memory state, active pager and run counters
pub struct Simulation {
    mem: Memory,
    pager: Box<dyn Pager>,
    current_pid: usize,
    instructions: u64,
    context_switches: u64,
    process_exits: u64,
    cost: u64,
}

impl Simulation {
    pub fn new(num_frames: usize, processes: Vec<Process>, pager: Box<dyn Pager>) -> Self {
        debug!(
            "simulation: {} frames, {} processes, {} pager",
            num_frames,
            processes.len(),
            pager.name()
        );
        Simulation {
            mem: Memory::new(num_frames, processes),
            pager,
            current_pid: 0,
            instructions: 0,
            context_switches: 0,
            process_exits: 0,
            cost: 0,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn current_pid(&self) -> usize {
        self.current_pid
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn summary(&self) -> Summary {
        Summary {
            instructions: self.instructions,
            context_switches: self.context_switches,
            process_exits: self.process_exits,
            cost: self.cost,
            pte_size: size_of::<Pte>(),
        }
    }

    fn check_pid(&self, pid: usize) -> Result<(), SimError> {
        if pid < self.mem.processes.len() {
            Ok(())
        } else {
            Err(SimError::UnknownProcess { pid, count: self.mem.processes.len() })
        }
    }

    fn validate(&self, instruction: Instruction) -> Result<(), SimError> {
        match instruction {
            Instruction::ContextSwitch(pid) | Instruction::Exit(pid) => self.check_pid(pid),
            Instruction::Read(vpage) | Instruction::Write(vpage) => {
                if vpage >= MAX_VPAGES {
                    return Err(SimError::VpageOutOfRange(vpage));
                }
                self.check_pid(self.current_pid)
            }
        }
    }

    /// Execute one instruction to completion, including any fault and eviction.
    /// Returns false when a read or write ended in a segmentation violation.
    pub fn step(
        &mut self,
        instruction: Instruction,
        sink: &mut dyn EventSink,
    ) -> Result<bool, SimError> {
        self.validate(instruction)?;

        sink.emit(Event::Instruction { index: self.instructions, instruction });
        self.instructions += 1;

        let completed = match instruction {
            Instruction::ContextSwitch(pid) => {
                self.context_switches += 1;
                self.current_pid = pid;
                self.cost += COST_CONTEXT_SWITCH;
                true
            }
            Instruction::Exit(pid) => {
                self.exit(pid, sink);
                true
            }
            Instruction::Read(vpage) => self.access(vpage, false, sink),
            Instruction::Write(vpage) => self.access(vpage, true, sink),
        };
        Ok(completed)
    }

    /// Run a whole trace
    pub fn run<I>(
        &mut self,
        instructions: I,
        sink: &mut dyn EventSink,
    ) -> Result<Summary, SimError>
    where
        I: IntoIterator<Item = Instruction>,
    {
        for instruction in instructions {
            self.step(instruction, sink)?;
        }
        Ok(self.summary())
    }

    /// Tear down every mapping of `pid` and forget its swap contents
    fn exit(&mut self, pid: usize, sink: &mut dyn EventSink) {
        sink.emit(Event::Exit(pid));
        self.process_exits += 1;
        self.cost += COST_PROCESS_EXIT;

        for vpage in 0..MAX_VPAGES {
            let pte = *self.mem.pte(pid, vpage);
            if pte.present() {
                sink.emit(Event::Unmap { pid, vpage });
                self.mem.processes[pid].stats.unmaps += 1;
                self.cost += COST_UNMAP;
                self.mem.frames[pte.frame()].mapped = false;
                if pte.file_mapped() && pte.modified() {
                    sink.emit(Event::Fout);
                    self.mem.processes[pid].stats.fouts += 1;
                    self.cost += COST_FOUT;
                }
                self.mem.pte_mut(pid, vpage).set_present(false);
                self.mem.push_free_frame(pte.frame());
            }
            // dirty anonymous pages are dropped, not written back
            self.mem.pte_mut(pid, vpage).set_paged_out(false);
        }
    }

    fn access(&mut self, vpage: usize, write: bool, sink: &mut dyn EventSink) -> bool {
        self.cost += COST_READ_WRITE;
        let pid = self.current_pid;

        if !self.mem.pte(pid, vpage).present() {
            trace!("page fault on {}:{}", pid, vpage);
            let mut handler = FaultHandler {
                mem: &mut self.mem,
                pager: self.pager.as_mut(),
                sink: &mut *sink,
                cost: &mut self.cost,
                clock: self.instructions,
            };
            if !handler.resolve(pid, vpage) {
                return false;
            }
        }

        let pte = self.mem.pte_mut(pid, vpage);
        pte.set_referenced(true);
        if write {
            if pte.write_protected() {
                sink.emit(Event::Segprot);
                self.mem.processes[pid].stats.segprot += 1;
                self.cost += COST_SEGPROT;
            } else {
                pte.set_modified(true);
            }
        }
        true
    }
}
