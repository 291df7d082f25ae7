use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::debug;

use crate::constants::*;
use crate::error::{Error, ParseError, Result};
use crate::memory::{Frame, Process, ProcessStats, Pte, Vma};
use crate::simulation::Instruction;

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

/// Processes and instruction trace loaded from an input file
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub processes: Vec<Process>,
    pub instructions: Vec<Instruction>,
}

/// Non-comment lines with their 1-based line numbers
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    /// Number of the last line consumed, comments included
    last_line: usize,
}

impl<'a> Lines<'a> {
    fn new(content: &'a str) -> Self {
        Lines { inner: content.lines().enumerate(), last_line: 0 }
    }

    fn next_valid(&mut self) -> Option<(usize, &'a str)> {
        for (i, line) in self.inner.by_ref() {
            self.last_line = i + 1;
            if !line.starts_with('#') && !line.trim().is_empty() {
                return Some((self.last_line, line));
            }
        }
        None
    }

    fn require(&mut self, what: &'static str) -> std::result::Result<(usize, &'a str), ParseError> {
        match self.next_valid() {
            Some(found) => Ok(found),
            None => Err(ParseError::Missing { line: self.last_line, what }),
        }
    }
}

fn parse_number(
    token: Option<&str>,
    line: usize,
    what: &'static str,
) -> std::result::Result<usize, ParseError> {
    let token = token.ok_or(ParseError::Missing { line, what })?;
    token
        .parse()
        .map_err(|_| ParseError::InvalidToken { line, what, token: token.to_string() })
}

fn parse_bit(
    token: Option<&str>,
    line: usize,
    what: &'static str,
) -> std::result::Result<bool, ParseError> {
    match token {
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(ParseError::InvalidToken { line, what, token: other.to_string() }),
        None => Err(ParseError::Missing { line, what }),
    }
}

fn check_vpage(vpage: usize, line: usize) -> std::result::Result<usize, ParseError> {
    if vpage >= MAX_VPAGES {
        return Err(ParseError::VpageOutOfRange { line, vpage, max: MAX_VPAGES - 1 });
    }
    Ok(vpage)
}

impl Workload {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = read_file(path.as_ref())?;
        Ok(Self::parse(&content)?)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, ParseError> {
        let mut lines = Lines::new(content);

        let (line, text) = lines.require("process count")?;
        let num_processes = parse_number(text.split_whitespace().next(), line, "process count")?;

        let mut processes = Vec::with_capacity(num_processes);
        for _ in 0..num_processes {
            processes.push(Self::parse_process(&mut lines)?);
        }

        let mut instructions = Vec::new();
        while let Some((line, text)) = lines.next_valid() {
            instructions.push(Self::parse_instruction(line, text, processes.len())?);
        }

        debug!("loaded {} processes, {} instructions", processes.len(), instructions.len());
        Ok(Workload { processes, instructions })
    }

    fn parse_process(lines: &mut Lines<'_>) -> std::result::Result<Process, ParseError> {
        let (line, text) = lines.require("VMA count")?;
        let num_vmas = parse_number(text.split_whitespace().next(), line, "VMA count")?;

        let mut vmas: Vec<Vma> = Vec::with_capacity(num_vmas);
        for _ in 0..num_vmas {
            let (line, text) = lines.require("VMA")?;
            let mut tokens = text.split_whitespace();
            let start = check_vpage(parse_number(tokens.next(), line, "start vpage")?, line)?;
            let end = check_vpage(parse_number(tokens.next(), line, "end vpage")?, line)?;
            let write_protected = parse_bit(tokens.next(), line, "write_protected")?;
            let file_mapped = parse_bit(tokens.next(), line, "file_mapped")?;

            if start > end {
                return Err(ParseError::InvertedVma { line, start, end });
            }
            let vma = Vma::new(start, end, write_protected, file_mapped);
            if vmas.iter().any(|other| other.overlaps(&vma)) {
                return Err(ParseError::OverlappingVma { line, start, end });
            }
            vmas.push(vma);
        }
        Ok(Process::new(vmas))
    }

    fn parse_instruction(
        line: usize,
        text: &str,
        num_processes: usize,
    ) -> std::result::Result<Instruction, ParseError> {
        let mut tokens = text.split_whitespace();
        let op = tokens.next().ok_or(ParseError::Missing { line, what: "operation" })?;
        let operand = parse_number(tokens.next(), line, "operand")?;

        let check_pid = |pid: usize| {
            if pid < num_processes {
                Ok(pid)
            } else {
                Err(ParseError::UnknownProcess { line, pid, count: num_processes })
            }
        };

        match op {
            "r" => Ok(Instruction::Read(check_vpage(operand, line)?)),
            "w" => Ok(Instruction::Write(check_vpage(operand, line)?)),
            "c" => Ok(Instruction::ContextSwitch(check_pid(operand)?)),
            "e" => Ok(Instruction::Exit(check_pid(operand)?)),
            other => Err(ParseError::UnknownOperation(other.to_string())),
        }
    }
}

/// Cyclic source of pre-generated random numbers
#[derive(Debug, Clone)]
pub struct RandomSource {
    values: Vec<usize>,
    offset: usize,
}

impl RandomSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = read_file(path.as_ref())?;
        Ok(Self::parse(&content)?)
    }

    /// First number is the count of the numbers that follow
    pub fn parse(content: &str) -> std::result::Result<Self, ParseError> {
        let mut tokens = content.split_whitespace();
        let declared = parse_number(tokens.next(), 1, "random count")?;
        let values = tokens
            .take(declared)
            .map(|t| parse_number(Some(t), 1, "random value"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(ParseError::EmptyRandomFile { declared });
        }
        debug!("random source: {} of {} declared values", values.len(), declared);
        Ok(RandomSource { values, offset: 0 })
    }

    /// Next value reduced into `0..bound`, wrapping around the sequence
    pub fn next_below(&mut self, bound: usize) -> usize {
        let value = self.values[self.offset];
        self.offset = (self.offset + 1) % self.values.len();
        value % bound
    }
}

// =========================================================================
// Report formatting
// =========================================================================

/// ` i:RMS` for present pages, ` #` for swapped, ` *` otherwise
pub fn format_page_table(page_table: &[Pte]) -> String {
    let mut out = String::new();
    for (i, pte) in page_table.iter().enumerate() {
        if pte.present() {
            let _ = write!(
                out,
                " {}:{}{}{}",
                i,
                if pte.referenced() { 'R' } else { '-' },
                if pte.modified() { 'M' } else { '-' },
                if pte.paged_out() { 'S' } else { '-' },
            );
        } else {
            out.push_str(if pte.paged_out() { " #" } else { " *" });
        }
    }
    out
}

pub fn format_frame_table(frames: &[Frame]) -> String {
    let mut out = String::new();
    for frame in frames {
        if frame.mapped {
            let _ = write!(out, " {}:{}", frame.pid, frame.vpage);
        } else {
            out.push_str(" *");
        }
    }
    out
}

pub fn format_stats(stats: &ProcessStats) -> String {
    format!(
        " U={} M={} I={} O={} FI={} FO={} Z={} SV={} SP={}",
        stats.unmaps,
        stats.maps,
        stats.ins,
        stats.outs,
        stats.fins,
        stats.fouts,
        stats.zeros,
        stats.segv,
        stats.segprot
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# process count
2
# process 0
2
0 15 0 0
20 30 1 1
#process 1
1
0 63 0 1
# trace
c 0
r 5
w 21
c 1
e 1
";

    #[test]
    fn test_parse_sample() {
        let workload = Workload::parse(SAMPLE).unwrap();
        assert_eq!(workload.processes.len(), 2);
        assert_eq!(
            workload.processes[0].vmas,
            vec![Vma::new(0, 15, false, false), Vma::new(20, 30, true, true)]
        );
        assert_eq!(workload.processes[1].vmas, vec![Vma::new(0, 63, false, true)]);
        assert_eq!(
            workload.instructions,
            vec![
                Instruction::ContextSwitch(0),
                Instruction::Read(5),
                Instruction::Write(21),
                Instruction::ContextSwitch(1),
                Instruction::Exit(1),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_operation() {
        let err = Workload::parse("1\n1\n0 63 0 0\nx 3\n").unwrap_err();
        assert_eq!(err, ParseError::UnknownOperation("x".into()));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let err = Workload::parse("1\n1\n0 63 0 0\nr 64\n").unwrap_err();
        assert_eq!(err, ParseError::VpageOutOfRange { line: 4, vpage: 64, max: 63 });

        let err = Workload::parse("1\n1\n0 63 0 0\nc 1\n").unwrap_err();
        assert_eq!(err, ParseError::UnknownProcess { line: 4, pid: 1, count: 1 });
    }

    #[test]
    fn test_parse_rejects_overlapping_vmas() {
        let err = Workload::parse("1\n2\n0 10 0 0\n10 20 0 0\n").unwrap_err();
        assert_eq!(err, ParseError::OverlappingVma { line: 4, start: 10, end: 20 });

        let err = Workload::parse("1\n1\n9 3 0 0\n").unwrap_err();
        assert_eq!(err, ParseError::InvertedVma { line: 3, start: 9, end: 3 });
    }

    #[test]
    fn test_parse_missing_vma() {
        let err = Workload::parse("1\n2\n0 10 0 0\n").unwrap_err();
        assert_eq!(err, ParseError::Missing { line: 3, what: "VMA" });

        // input ends after trailing comments
        let err = Workload::parse("2\n1\n0 10 0 0\n# process 1\n").unwrap_err();
        assert_eq!(err, ParseError::Missing { line: 4, what: "VMA count" });

        let err = Workload::parse("").unwrap_err();
        assert_eq!(err, ParseError::Missing { line: 0, what: "process count" });

        let err = Workload::parse("1\n1\n0 10 0\n").unwrap_err();
        assert_eq!(err, ParseError::Missing { line: 3, what: "file_mapped" });
    }

    #[test]
    fn test_parse_invalid_bit() {
        let err = Workload::parse("1\n1\n0 10 2 0\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidToken { what: "write_protected", .. }));
    }

    #[test]
    fn test_random_source_wraps() {
        let mut source = RandomSource::parse("2 7 4").unwrap();
        assert_eq!(source.next_below(5), 2);
        assert_eq!(source.next_below(5), 4);
        assert_eq!(source.next_below(5), 2);
    }

    #[test]
    fn test_random_source_honours_declared_count() {
        let mut source = RandomSource::parse("1\n3\n9\n").unwrap();
        assert_eq!(source.next_below(10), 3);
        assert_eq!(source.next_below(10), 3);

        assert_eq!(
            RandomSource::parse("4\n").unwrap_err(),
            ParseError::EmptyRandomFile { declared: 4 }
        );
    }

    #[test]
    fn test_format_page_table() {
        let mut table = [Pte::default(); 4];
        table[0].set_present(true);
        table[0].set_referenced(true);
        table[1].set_paged_out(true);
        table[3].set_present(true);
        table[3].set_modified(true);
        table[3].set_paged_out(true);
        assert_eq!(format_page_table(&table), " 0:R-- # * 3:-MS");
    }

    #[test]
    fn test_format_frame_table() {
        let frames = [
            Frame { pid: 0, vpage: 12, mapped: true, ..Frame::default() },
            Frame::default(),
            Frame { pid: 1, vpage: 3, mapped: true, ..Frame::default() },
        ];
        assert_eq!(format_frame_table(&frames), " 0:12 * 1:3");
    }

    #[test]
    fn test_format_stats() {
        let stats =
            ProcessStats { unmaps: 1, maps: 2, zeros: 2, segv: 1, ..ProcessStats::default() };
        assert_eq!(format_stats(&stats), " U=1 M=2 I=0 O=0 FI=0 FO=0 Z=2 SV=1 SP=0");
    }

    #[test]
    fn test_missing_file() {
        let err = Workload::from_file("/nonexistent/input").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
