//! Page replacement policies.
//!
//! Every pager is invoked only once the free pool is exhausted, so every frame
//! in the table is mapped and its reverse mapping is valid. Each pager owns its
//! scan cursor; the frame table is borrowed for the duration of a selection.

use std::fmt::Write as _;

use log::trace;

use crate::constants::*;
use crate::error::ConfigError;
use crate::event::{Event, EventSink};
use crate::io::RandomSource;
use crate::memory::Memory;

/// Replacement policy capability
pub trait Pager {
    /// Pick the frame to evict. `clock` is the current instruction count.
    fn select_victim(&mut self, mem: &mut Memory, clock: u64, sink: &mut dyn EventSink) -> usize;

    /// Called whenever a frame becomes present for a new page
    fn on_activate(&mut self, _mem: &mut Memory, _frame: usize, _clock: u64) {}

    fn name(&self) -> &'static str;
}

/// Algorithm selector, keyed by the CLI letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerKind {
    Fifo,
    Random,
    Clock,
    Esc,
    Aging,
    WorkingSet,
}

impl PagerKind {
    pub fn from_letter(letter: char) -> Result<Self, ConfigError> {
        match letter {
            'f' => Ok(Self::Fifo),
            'r' => Ok(Self::Random),
            'c' => Ok(Self::Clock),
            'e' => Ok(Self::Esc),
            'a' => Ok(Self::Aging),
            'w' => Ok(Self::WorkingSet),
            other => Err(ConfigError::UnknownAlgorithm(other)),
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::Fifo => 'f',
            Self::Random => 'r',
            Self::Clock => 'c',
            Self::Esc => 'e',
            Self::Aging => 'a',
            Self::WorkingSet => 'w',
        }
    }

    /// Build the pager. Random needs its number source; others ignore it.
    pub fn build(self, random: Option<RandomSource>) -> Result<Box<dyn Pager>, ConfigError> {
        Ok(match self {
            Self::Fifo => Box::new(FifoPager::new()),
            Self::Random => {
                let source = random.ok_or(ConfigError::MissingRandomFile)?;
                Box::new(RandomPager::new(source))
            }
            Self::Clock => Box::new(ClockPager::new()),
            Self::Esc => Box::new(EscPager::new()),
            Self::Aging => Box::new(AgingPager::new()),
            Self::WorkingSet => Box::new(WorkingSetPager::new()),
        })
    }
}

#[inline]
fn next(frame: usize, num_frames: usize) -> usize {
    (frame + 1) % num_frames
}

#[inline]
fn prev(frame: usize, num_frames: usize) -> usize {
    (frame + num_frames - 1) % num_frames
}

// =========================================================================
// FIFO
// =========================================================================

/// Evicts frames in allocation order, ignoring R/M bits
#[derive(Debug, Default)]
pub struct FifoPager {
    hand: usize,
}

impl FifoPager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pager for FifoPager {
    fn select_victim(&mut self, mem: &mut Memory, _clock: u64, sink: &mut dyn EventSink) -> usize {
        let n = mem.num_frames();
        let victim = self.hand % n;
        if sink.wants_select() {
            sink.emit(Event::Select(format!("ASELECT {}", victim)));
        }
        self.hand = next(victim, n);
        victim
    }

    fn name(&self) -> &'static str {
        "fifo"
    }
}

// =========================================================================
// Clock
// =========================================================================

/// Second-chance: skips (and clears) referenced frames
#[derive(Debug, Default)]
pub struct ClockPager {
    hand: usize,
}

impl ClockPager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pager for ClockPager {
    fn select_victim(&mut self, mem: &mut Memory, _clock: u64, sink: &mut dyn EventSink) -> usize {
        let n = mem.num_frames();
        let start = self.hand % n;
        let mut hand = start;
        let mut inspected = 1;

        // at most one full lap clearing bits, then the start frame is clear
        loop {
            let pte = mem.frame_pte_mut(hand);
            if !pte.referenced() {
                break;
            }
            pte.set_referenced(false);
            hand = next(hand, n);
            inspected += 1;
        }

        if sink.wants_select() {
            sink.emit(Event::Select(format!("ASELECT {} {}", start, inspected)));
        }
        trace!("clock: victim {} after {} frames", hand, inspected);
        self.hand = next(hand, n);
        hand
    }

    fn name(&self) -> &'static str {
        "clock"
    }
}

// =========================================================================
// ESC / NRU
// =========================================================================

/// Enhanced second chance over the four (R, M) classes.
///
/// ```text
///            R   M
/// class 0:   0   0
/// class 1:   0   1
/// class 2:   1   0
/// class 3:   1   1
/// ```
#[derive(Debug, Default)]
pub struct EscPager {
    hand: usize,
    last_reset: u64,
}

impl EscPager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pager for EscPager {
    fn select_victim(&mut self, mem: &mut Memory, clock: u64, sink: &mut dyn EventSink) -> usize {
        let n = mem.num_frames();
        let start = self.hand % n;
        let reset = clock - self.last_reset >= ESC_RESET_CYCLE;
        if reset {
            self.last_reset = clock;
        }

        let mut first_in_class: [Option<usize>; 4] = [None; 4];
        let mut victim = None;
        let mut inspected = 0;
        let mut hand = start;
        loop {
            inspected += 1;
            let pte = mem.frame_pte_mut(hand);
            let class = 2 * pte.referenced() as usize + pte.modified() as usize;
            first_in_class[class].get_or_insert(hand);

            if reset {
                pte.set_referenced(false);
            } else if class == 0 {
                victim = Some((0, hand));
                break;
            }

            hand = next(hand, n);
            if hand == start {
                break;
            }
        }

        // a full lap always records at least one class
        let (class, victim) = victim
            .or_else(|| first_in_class.iter().enumerate().find_map(|(c, f)| f.map(|f| (c, f))))
            .unwrap_or((0, start));

        if sink.wants_select() {
            sink.emit(Event::Select(format!(
                "ASELECT: {:2} {} | {} {:2} {:2}",
                start, reset as u8, class, victim, inspected
            )));
        }
        trace!("esc: reset={} class={} victim={}", reset, class, victim);
        self.hand = next(victim, n);
        victim
    }

    fn name(&self) -> &'static str {
        "esc"
    }
}

// =========================================================================
// Aging
// =========================================================================

/// Shifting 32-bit history register per frame; smallest value is evicted
#[derive(Debug, Default)]
pub struct AgingPager {
    hand: usize,
}

impl AgingPager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pager for AgingPager {
    fn select_victim(&mut self, mem: &mut Memory, _clock: u64, sink: &mut dyn EventSink) -> usize {
        let n = mem.num_frames();
        let start = self.hand % n;
        let mut victim = start;
        let mut hand = start;
        loop {
            mem.frames[hand].age >>= 1;
            let pte = mem.frame_pte_mut(hand);
            if pte.referenced() {
                pte.set_referenced(false);
                mem.frames[hand].age |= AGING_HIGH_BIT;
            }
            if mem.frames[hand].age < mem.frames[victim].age {
                victim = hand;
            }
            hand = next(hand, n);
            if hand == start {
                break;
            }
        }

        if sink.wants_select() {
            let mut line = format!("ASELECT {}-{} | ", start, prev(start, n));
            let mut f = start;
            loop {
                let _ = write!(line, "{}:{:x} ", f, mem.frames[f].age);
                f = next(f, n);
                if f == start {
                    break;
                }
            }
            let _ = write!(line, "| {}", victim);
            sink.emit(Event::Select(line));
        }
        trace!("aging: victim {} age {:#x}", victim, mem.frames[victim].age);
        self.hand = next(victim, n);
        victim
    }

    fn on_activate(&mut self, mem: &mut Memory, frame: usize, _clock: u64) {
        mem.frames[frame].age = 0;
    }

    fn name(&self) -> &'static str {
        "aging"
    }
}

// =========================================================================
// Working set
// =========================================================================

/// Evicts the first frame idle for more than TAU ticks, else the oldest
#[derive(Debug, Default)]
pub struct WorkingSetPager {
    hand: usize,
}

impl WorkingSetPager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pager for WorkingSetPager {
    fn select_victim(&mut self, mem: &mut Memory, clock: u64, sink: &mut dyn EventSink) -> usize {
        let n = mem.num_frames();
        let start = self.hand % n;
        let detail = sink.wants_select();
        let mut line = String::new();
        let mut oldest = start;
        let mut hand = start;
        let mut inspected = 0;
        loop {
            inspected += 1;
            let frame = mem.frames[hand];
            let referenced = mem.frame_pte(hand).referenced();
            if detail {
                let _ = write!(
                    line,
                    "{}({} {}:{} {}) ",
                    hand, referenced as u8, frame.pid, frame.vpage, frame.last_used
                );
            }

            if referenced {
                mem.frames[hand].last_used = clock;
                mem.frame_pte_mut(hand).set_referenced(false);
            } else if clock.saturating_sub(frame.last_used) > WORKING_SET_TAU {
                if detail {
                    let _ = write!(line, "STOP({}) ", inspected);
                }
                oldest = hand;
                break;
            }

            if mem.frames[hand].last_used < mem.frames[oldest].last_used {
                oldest = hand;
            }
            hand = next(hand, n);
            if hand == start {
                break;
            }
        }

        if detail {
            sink.emit(Event::Select(format!(
                "ASELECT {}-{} | {}| {}",
                start,
                prev(start, n),
                line,
                oldest
            )));
        }
        trace!("working set: victim {} last_used {}", oldest, mem.frames[oldest].last_used);
        self.hand = next(oldest, n);
        oldest
    }

    fn on_activate(&mut self, mem: &mut Memory, frame: usize, clock: u64) {
        mem.frames[frame].age = 0;
        mem.frames[frame].last_used = clock;
    }

    fn name(&self) -> &'static str {
        "working-set"
    }
}

// =========================================================================
// Random
// =========================================================================

/// Draws victims from a pre-loaded number sequence
#[derive(Debug)]
pub struct RandomPager {
    source: RandomSource,
}

impl RandomPager {
    pub fn new(source: RandomSource) -> Self {
        RandomPager { source }
    }
}

impl Pager for RandomPager {
    fn select_victim(&mut self, mem: &mut Memory, _clock: u64, _sink: &mut dyn EventSink) -> usize {
        self.source.next_below(mem.num_frames())
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
