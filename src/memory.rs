use std::collections::VecDeque;
use std::mem::size_of;

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::constants::*;

/// Virtual memory area: a declared range of valid pages and its attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vma {
    pub start_vpage: usize,
    pub end_vpage: usize,
    pub write_protected: bool,
    pub file_mapped: bool,
}

impl Vma {
    pub fn new(
        start_vpage: usize,
        end_vpage: usize,
        write_protected: bool,
        file_mapped: bool,
    ) -> Self {
        Vma { start_vpage, end_vpage, write_protected, file_mapped }
    }

    /// Inclusive on both ends
    #[inline]
    pub fn contains(&self, vpage: usize) -> bool {
        vpage >= self.start_vpage && vpage <= self.end_vpage
    }

    pub fn overlaps(&self, other: &Vma) -> bool {
        self.start_vpage <= other.end_vpage && other.start_vpage <= self.end_vpage
    }
}

bitflags! {
    /// Single-bit fields of a packed PTE. Bits 5..12 hold the frame number.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        const PRESENT = 1 << 0;
        const REFERENCED = 1 << 1;
        const MODIFIED = 1 << 2;
        const WRITE_PROTECTED = 1 << 3;
        const PAGED_OUT = 1 << 4;
        const FILE_MAPPED = 1 << 12;
        const VMA_CHECKED = 1 << 13;
        const VMA_VALID = 1 << 14;
    }
}

const FRAME_SHIFT: u32 = 5;
const FRAME_MASK: u32 = ((1 << FRAME_BITS) - 1) << FRAME_SHIFT;

/// Page table entry packed into 32 bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pte(u32);

const_assert_eq!(size_of::<Pte>(), 4);

macro_rules! pte_flag {
    ($get:ident, $set:ident, $flag:ident) => {
        #[inline]
        pub fn $get(&self) -> bool {
            self.flags().contains(PteFlags::$flag)
        }

        #[inline]
        pub fn $set(&mut self, value: bool) {
            self.set_flag(PteFlags::$flag, value);
        }
    };
}

impl Pte {
    #[inline]
    pub fn flags(&self) -> PteFlags {
        PteFlags::from_bits_retain(self.0)
    }

    #[inline]
    fn set_flag(&mut self, flag: PteFlags, value: bool) {
        let mut flags = self.flags();
        flags.set(flag, value);
        self.0 = flags.bits();
    }

    pte_flag!(present, set_present, PRESENT);
    pte_flag!(referenced, set_referenced, REFERENCED);
    pte_flag!(modified, set_modified, MODIFIED);
    pte_flag!(write_protected, set_write_protected, WRITE_PROTECTED);
    pte_flag!(paged_out, set_paged_out, PAGED_OUT);
    pte_flag!(file_mapped, set_file_mapped, FILE_MAPPED);
    pte_flag!(vma_checked, set_vma_checked, VMA_CHECKED);
    pte_flag!(vma_valid, set_vma_valid, VMA_VALID);

    /// Frame number; meaningful only while present
    #[inline]
    pub fn frame(&self) -> usize {
        ((self.0 & FRAME_MASK) >> FRAME_SHIFT) as usize
    }

    #[inline]
    pub fn set_frame(&mut self, frame: usize) {
        debug_assert!(frame < MAX_FRAMES);
        self.0 = (self.0 & !FRAME_MASK) | (((frame as u32) << FRAME_SHIFT) & FRAME_MASK);
    }

    /// Raw 32-bit representation
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Physical frame with its reverse mapping and pager bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub pid: usize,
    pub vpage: usize,
    pub mapped: bool,
    /// Aging pager history register
    pub age: u32,
    /// Working-set pager timestamp (instruction count)
    pub last_used: u64,
}

/// Per-process counters, only ever read for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub unmaps: u64,
    pub maps: u64,
    pub ins: u64,
    pub outs: u64,
    pub fins: u64,
    pub fouts: u64,
    pub zeros: u64,
    pub segv: u64,
    pub segprot: u64,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub vmas: Vec<Vma>,
    pub page_table: [Pte; MAX_VPAGES],
    pub stats: ProcessStats,
}

impl Process {
    pub fn new(vmas: Vec<Vma>) -> Self {
        Process {
            vmas,
            page_table: [Pte::default(); MAX_VPAGES],
            stats: ProcessStats::default(),
        }
    }

    /// Linear search of the VMA list
    pub fn find_vma(&self, vpage: usize) -> Option<&Vma> {
        self.vmas.iter().find(|vma| vma.contains(vpage))
    }
}

/// Process pool, frame table and free pool; all cross references are indices
#[derive(Debug, Clone)]
pub struct Memory {
    pub processes: Vec<Process>,
    pub frames: Vec<Frame>,
    free_frames: VecDeque<usize>,
}

impl Memory {
    /// All frames start in the free pool, in index order
    pub fn new(num_frames: usize, processes: Vec<Process>) -> Self {
        Memory {
            processes,
            frames: vec![Frame::default(); num_frames],
            free_frames: (0..num_frames).collect(),
        }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn pop_free_frame(&mut self) -> Option<usize> {
        self.free_frames.pop_front()
    }

    pub fn push_free_frame(&mut self, frame: usize) {
        self.free_frames.push_back(frame);
    }

    pub fn free_count(&self) -> usize {
        self.free_frames.len()
    }

    pub fn free_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.free_frames.iter().copied()
    }

    #[inline]
    pub fn pte(&self, pid: usize, vpage: usize) -> &Pte {
        &self.processes[pid].page_table[vpage]
    }

    #[inline]
    pub fn pte_mut(&mut self, pid: usize, vpage: usize) -> &mut Pte {
        &mut self.processes[pid].page_table[vpage]
    }

    /// Reverse mapping frame -> PTE
    #[inline]
    pub fn frame_pte(&self, frame: usize) -> &Pte {
        let Frame { pid, vpage, .. } = self.frames[frame];
        self.pte(pid, vpage)
    }

    #[inline]
    pub fn frame_pte_mut(&mut self, frame: usize) -> &mut Pte {
        let Frame { pid, vpage, .. } = self.frames[frame];
        self.pte_mut(pid, vpage)
    }

    pub fn present_count(&self) -> usize {
        self.processes
            .iter()
            .flat_map(|p| p.page_table.iter())
            .filter(|pte| pte.present())
            .count()
    }

    pub fn mapped_count(&self) -> usize {
        self.frames.iter().filter(|f| f.mapped).count()
    }

    /// Check both directions of the frame <-> PTE relation
    pub fn is_consistent(&self) -> bool {
        let frames_ok = self.frames.iter().enumerate().filter(|(_, f)| f.mapped).all(|(i, f)| {
            let pte = self.pte(f.pid, f.vpage);
            pte.present() && pte.frame() == i
        });
        let ptes_ok = self.processes.iter().enumerate().all(|(pid, p)| {
            p.page_table.iter().enumerate().filter(|(_, pte)| pte.present()).all(|(vpage, pte)| {
                let f = &self.frames[pte.frame()];
                f.mapped && f.pid == pid && f.vpage == vpage
            })
        });
        frames_ok && ptes_ok && self.present_count() == self.mapped_count()
    }
}
