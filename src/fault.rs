//! Frame allocation with eviction, and the page fault handler.
//!
//! The order of side effects here is observable: UNMAP, then the write-back
//! event, then the fill event, then MAP. Costs are charged in the same order.

use log::trace;

use crate::constants::*;
use crate::event::{Event, EventSink};
use crate::memory::{Frame, Memory};
use crate::pager::Pager;

/// Everything a fault needs, borrowed from the running simulation
pub struct FaultHandler<'a> {
    pub mem: &'a mut Memory,
    pub pager: &'a mut dyn Pager,
    pub sink: &'a mut dyn EventSink,
    pub cost: &'a mut u64,
    /// Current instruction count
    pub clock: u64,
}

impl FaultHandler<'_> {
    /// Take a frame from the free pool, or evict the pager's victim. Never fails.
    pub fn acquire_frame(&mut self) -> usize {
        if let Some(frame) = self.mem.pop_free_frame() {
            return frame;
        }

        let frame = self.pager.select_victim(self.mem, self.clock, self.sink);
        let Frame { pid, vpage, .. } = self.mem.frames[frame];
        trace!("evicting frame {} from {}:{}", frame, pid, vpage);

        self.sink.emit(Event::Unmap { pid, vpage });
        self.mem.processes[pid].stats.unmaps += 1;
        *self.cost += COST_UNMAP;

        let pte = *self.mem.pte(pid, vpage);
        if pte.modified() {
            if pte.file_mapped() {
                self.sink.emit(Event::Fout);
                self.mem.processes[pid].stats.fouts += 1;
                *self.cost += COST_FOUT;
            } else {
                self.mem.pte_mut(pid, vpage).set_paged_out(true);
                self.sink.emit(Event::Out);
                self.mem.processes[pid].stats.outs += 1;
                *self.cost += COST_OUT;
            }
        }

        // paged_out stays: the swap copy outlives the mapping
        let pte = self.mem.pte_mut(pid, vpage);
        pte.set_present(false);
        pte.set_modified(false);
        pte.set_referenced(false);
        frame
    }

    /// Service a fault on `pid:vpage`. Returns false on a segmentation violation.
    pub fn resolve(&mut self, pid: usize, vpage: usize) -> bool {
        let pte = self.mem.pte(pid, vpage);
        if !pte.vma_checked() {
            let vma = self.mem.processes[pid].find_vma(vpage).copied();
            let pte = self.mem.pte_mut(pid, vpage);
            pte.set_vma_checked(true);
            if let Some(vma) = vma {
                pte.set_vma_valid(true);
                pte.set_file_mapped(vma.file_mapped);
                pte.set_write_protected(vma.write_protected);
            }
        }

        if !self.mem.pte(pid, vpage).vma_valid() {
            trace!("{}:{} outside every VMA", pid, vpage);
            self.sink.emit(Event::Segv);
            self.mem.processes[pid].stats.segv += 1;
            *self.cost += COST_SEGV;
            return false;
        }

        let frame = self.acquire_frame();

        let pte = *self.mem.pte(pid, vpage);
        let stats = &mut self.mem.processes[pid].stats;
        if pte.paged_out() {
            self.sink.emit(Event::In);
            stats.ins += 1;
            *self.cost += COST_IN;
        } else if pte.file_mapped() {
            self.sink.emit(Event::Fin);
            stats.fins += 1;
            *self.cost += COST_FIN;
        } else {
            self.sink.emit(Event::Zero);
            stats.zeros += 1;
            *self.cost += COST_ZERO;
        }

        let entry = &mut self.mem.frames[frame];
        entry.pid = pid;
        entry.vpage = vpage;
        entry.mapped = true;
        self.sink.emit(Event::Map(frame));
        self.mem.processes[pid].stats.maps += 1;
        self.pager.on_activate(self.mem, frame, self.clock);
        *self.cost += COST_MAP;

        let pte = self.mem.pte_mut(pid, vpage);
        pte.set_frame(frame);
        pte.set_present(true);
        true
    }
}
