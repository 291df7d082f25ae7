// virtual address space per process ~pages
pub const MAX_VPAGES: usize = 64;

// PTE frame field is 7 bits wide, so the frame table can't grow past this
pub const FRAME_BITS: u32 = 7;
pub const MAX_FRAMES: usize = 1 << FRAME_BITS;
pub const DEFAULT_FRAMES: usize = 4;

// cost table (cycles charged per event kind)
pub const COST_READ_WRITE: u64 = 1;
pub const COST_CONTEXT_SWITCH: u64 = 130;
pub const COST_PROCESS_EXIT: u64 = 1230;
pub const COST_MAP: u64 = 350;
pub const COST_UNMAP: u64 = 410;
pub const COST_IN: u64 = 3200;
pub const COST_OUT: u64 = 2750;
pub const COST_FIN: u64 = 2350;
pub const COST_FOUT: u64 = 2800;
pub const COST_ZERO: u64 = 150;
pub const COST_SEGV: u64 = 440;
pub const COST_SEGPROT: u64 = 410;

/// Instructions between two referenced-bit sweeps of the ESC pager.
pub const ESC_RESET_CYCLE: u64 = 48;

/// Working-set window in instruction ticks.
pub const WORKING_SET_TAU: u64 = 49;

pub const AGING_HIGH_BIT: u32 = 0x8000_0000;
