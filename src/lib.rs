pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fault;
pub mod io;
pub mod memory;
pub mod pager;
pub mod simulation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use config::{Config, OutputOptions};
pub use constants::*;
pub use error::{Error, Result};
pub use event::{Event, EventSink, NullSink};
pub use memory::{Frame, Memory, Process, Pte, Vma};
pub use pager::{Pager, PagerKind};
pub use simulation::{Instruction, Simulation, Summary};
pub use vm_manager::VmManager;
