//! Top-level driver: loads the workload, runs it and writes the reports.

use std::io::{self, Write};

use log::{debug, info};

use crate::config::{Config, OutputOptions};
use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::io::{format_frame_table, format_page_table, format_stats, RandomSource, Workload};
use crate::simulation::{Instruction, Simulation, Summary};

/// Writes events to the report stream according to the output options
struct ReportSink<'w, W: Write> {
    out: &'w mut W,
    options: OutputOptions,
    error: Option<io::Error>,
}

impl<'w, W: Write> ReportSink<'w, W> {
    fn new(out: &'w mut W, options: OutputOptions) -> Self {
        ReportSink { out, options, error: None }
    }

    fn write_line(&mut self, line: impl std::fmt::Display) {
        if self.error.is_none() {
            if let Err(e) = writeln!(self.out, "{}", line) {
                self.error = Some(e);
            }
        }
    }

    fn check(&mut self) -> io::Result<()> {
        self.error.take().map_or(Ok(()), Err)
    }
}

impl<W: Write> EventSink for ReportSink<'_, W> {
    fn emit(&mut self, event: Event) {
        let wanted = match event {
            Event::Exit(_) => true,
            Event::Select(_) => self.options.pager_detail,
            _ => self.options.trace,
        };
        if wanted {
            self.write_line(event);
        }
    }

    fn wants_select(&self) -> bool {
        self.options.pager_detail
    }
}

pub struct VmManager {
    config: Config,
    workload: Workload,
    random: Option<RandomSource>,
}

impl VmManager {
    /// Validate the configuration and read the input (and random) file
    pub fn load(config: Config) -> Result<Self> {
        config.validate()?;
        let workload = Workload::from_file(&config.input_file)?;
        let random = config.random_file.as_ref().map(RandomSource::from_file).transpose()?;
        info!(
            "loaded {}: {} processes, {} instructions",
            config.input_file.display(),
            workload.processes.len(),
            workload.instructions.len()
        );
        Ok(VmManager { config, workload, random })
    }

    /// Build from already-parsed parts
    pub fn with_workload(
        config: Config,
        workload: Workload,
        random: Option<RandomSource>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(VmManager { config, workload, random })
    }

    /// Replay the trace, writing every requested report to `out`
    pub fn run<W: Write>(self, out: &mut W) -> Result<Summary> {
        let VmManager { config, workload, random } = self;
        let options = config.output;
        let pager = config.algorithm.build(random)?;
        let mut sim = Simulation::new(config.num_frames, workload.processes, pager);

        let mut sink = ReportSink::new(out, options);
        for instruction in workload.instructions {
            let completed = sim.step(instruction, &mut sink)?;
            let access = matches!(instruction, Instruction::Read(_) | Instruction::Write(_));
            if access && completed && options.per_instruction() {
                write_tables_after_access(&sim, &mut sink);
            }
            sink.check()?;
        }

        let summary = sim.summary();
        debug!("run finished: {}", summary);
        write_final_reports(&sim, &summary, options, sink.out)?;
        Ok(summary)
    }
}

fn write_tables_after_access<W: Write>(sim: &Simulation, sink: &mut ReportSink<'_, W>) {
    let mem = sim.memory();
    if sink.options.current_page_table {
        let pid = sim.current_pid();
        sink.write_line(format_args!(
            "PT[{}]: {}",
            pid,
            format_page_table(&mem.processes[pid].page_table)
        ));
    }
    if sink.options.all_page_tables {
        for (pid, process) in mem.processes.iter().enumerate() {
            let table = format_page_table(&process.page_table);
            sink.write_line(format_args!("PT[{}]:{}", pid, table));
        }
    }
    if sink.options.frame_table_each {
        sink.write_line(format_args!("FT:{}", format_frame_table(&mem.frames)));
    }
}

fn write_final_reports<W: Write>(
    sim: &Simulation,
    summary: &Summary,
    options: OutputOptions,
    out: &mut W,
) -> io::Result<()> {
    let mem = sim.memory();
    if options.page_tables {
        for (pid, process) in mem.processes.iter().enumerate() {
            writeln!(out, "PT[{}]:{}", pid, format_page_table(&process.page_table))?;
        }
    }
    if options.frame_table {
        writeln!(out, "FT:{}", format_frame_table(&mem.frames))?;
    }
    if options.summary {
        for (pid, process) in mem.processes.iter().enumerate() {
            writeln!(out, "PROC[{}]:{}", pid, format_stats(&process.stats))?;
        }
        writeln!(out, "{}", summary)?;
    }
    Ok(())
}
