//! Output tokens produced by the simulation, in causal order.

use std::fmt;

use crate::simulation::Instruction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Instruction about to execute, with its 0-based index
    Instruction { index: u64, instruction: Instruction },
    Exit(usize),
    Unmap { pid: usize, vpage: usize },
    Out,
    Fout,
    In,
    Fin,
    Zero,
    Map(usize),
    Segv,
    Segprot,
    /// Pager detail line describing how a victim was chosen
    Select(String),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Instruction { index, instruction } => {
                write!(f, "{}: ==> {}", index, instruction)
            }
            Event::Exit(pid) => write!(f, "EXIT current process {}", pid),
            Event::Unmap { pid, vpage } => write!(f, " UNMAP {}:{}", pid, vpage),
            Event::Out => write!(f, " OUT"),
            Event::Fout => write!(f, " FOUT"),
            Event::In => write!(f, " IN"),
            Event::Fin => write!(f, " FIN"),
            Event::Zero => write!(f, " ZERO"),
            Event::Map(frame) => write!(f, " MAP {}", frame),
            Event::Segv => write!(f, " SEGV"),
            Event::Segprot => write!(f, " SEGPROT"),
            Event::Select(detail) => f.write_str(detail),
        }
    }
}

/// Receiver of simulation events
pub trait EventSink {
    fn emit(&mut self, event: Event);

    /// Whether pagers should bother formatting selection detail
    fn wants_select(&self) -> bool {
        false
    }
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }

    fn wants_select(&self) -> bool {
        true
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: Event) {}
}
