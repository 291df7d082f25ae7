//! Run configuration shared by the CLI and library callers.

use std::path::PathBuf;

use crate::constants::*;
use crate::error::ConfigError;
use crate::pager::PagerKind;

/// Which reports to produce, one flag per `-o` letter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// `O`: instruction trace with fault/eviction events
    pub trace: bool,
    /// `P`: final page tables
    pub page_tables: bool,
    /// `F`: final frame table
    pub frame_table: bool,
    /// `S`: per-process statistics and the cost summary
    pub summary: bool,
    /// `a`: pager selection detail
    pub pager_detail: bool,
    /// `x`: current page table after every instruction
    pub current_page_table: bool,
    /// `y`: every page table after every instruction
    pub all_page_tables: bool,
    /// `f`: frame table after every instruction
    pub frame_table_each: bool,
}

impl OutputOptions {
    pub fn parse(letters: &str) -> Result<Self, ConfigError> {
        let mut options = OutputOptions::default();
        for c in letters.chars() {
            let flag = match c {
                'O' => &mut options.trace,
                'P' => &mut options.page_tables,
                'F' => &mut options.frame_table,
                'S' => &mut options.summary,
                'a' => &mut options.pager_detail,
                'x' => &mut options.current_page_table,
                'y' => &mut options.all_page_tables,
                'f' => &mut options.frame_table_each,
                other => return Err(ConfigError::UnknownOutputOption(other)),
            };
            *flag = true;
        }
        Ok(options)
    }

    /// Anything printed between instructions
    pub fn per_instruction(&self) -> bool {
        self.trace
            || self.pager_detail
            || self.current_page_table
            || self.all_page_tables
            || self.frame_table_each
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub num_frames: usize,
    pub algorithm: PagerKind,
    pub output: OutputOptions,
    pub input_file: PathBuf,
    pub random_file: Option<PathBuf>,
}

impl Config {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Config {
            num_frames: DEFAULT_FRAMES,
            algorithm: PagerKind::Fifo,
            output: OutputOptions::default(),
            input_file: input_file.into(),
            random_file: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_frames == 0 || self.num_frames > MAX_FRAMES {
            return Err(ConfigError::FrameCount(self.num_frames));
        }
        if self.algorithm == PagerKind::Random && self.random_file.is_none() {
            return Err(ConfigError::MissingRandomFile);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_options() {
        let options = OutputOptions::parse("OPFS").unwrap();
        assert!(options.trace && options.page_tables && options.frame_table && options.summary);
        assert!(!options.pager_detail);

        let options = OutputOptions::parse("axyf").unwrap();
        assert!(options.pager_detail && options.current_page_table);
        assert!(options.all_page_tables && options.frame_table_each);
        assert!(!options.trace);
        assert!(options.per_instruction());

        assert_eq!(OutputOptions::parse("OQ"), Err(ConfigError::UnknownOutputOption('Q')));
        assert!(!OutputOptions::parse("").unwrap().per_instruction());
    }

    #[test]
    fn test_validate_frames() {
        let mut config = Config::new("in");
        assert!(config.validate().is_ok());
        config.num_frames = 0;
        assert_eq!(config.validate(), Err(ConfigError::FrameCount(0)));
        config.num_frames = MAX_FRAMES + 1;
        assert_eq!(config.validate(), Err(ConfigError::FrameCount(129)));
        config.num_frames = MAX_FRAMES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_random_needs_file() {
        let mut config = Config::new("in");
        config.algorithm = PagerKind::Random;
        assert_eq!(config.validate(), Err(ConfigError::MissingRandomFile));
        config.random_file = Some("rfile".into());
        assert!(config.validate().is_ok());
    }
}
