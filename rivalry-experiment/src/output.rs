use crate::error::{ExperimentError, Result};
use chrono::{DateTime, Local};
use rivalry_core::{LoggedEvent, RunRecord};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Suffix identifying event files in a data directory
pub const OUTPUT_SUFFIX: &str = "_outputDict.json";

/// Everything a session leaves behind: one event list and one record per run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionOutput {
    pub subject: u32,
    pub session: u32,
    pub event_array: Vec<Vec<LoggedEvent>>,
    pub parameter_array: Vec<RunRecord>,
}

impl SessionOutput {
    /// `<subject>_<session>_<date>_<time>_outputDict.json`
    pub fn file_name(&self, stamp: &DateTime<Local>) -> String {
        format!(
            "{}_{}_{}{}",
            self.subject,
            self.session,
            stamp.format("%Y-%m-%d_%H.%M.%S"),
            OUTPUT_SUFFIX
        )
    }

    /// Writes into `dir` without replacing an existing file. A second save in
    /// the same second gets a `-2`, `-3`, ... before the suffix.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        self.save_stamped(dir, &Local::now())
    }

    pub(crate) fn save_stamped(&self, dir: &Path, stamp: &DateTime<Local>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(ExperimentError::io(dir))?;
        let base = self.file_name(stamp);
        let (file, path) = create_new(dir, &base)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(ExperimentError::json(&path))?;
        writer.flush().map_err(ExperimentError::io(&path))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(ExperimentError::io(path))?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(ExperimentError::json(path))
    }
}

fn create_new(dir: &Path, base: &str) -> Result<(File, PathBuf)> {
    let stem = base.strip_suffix(OUTPUT_SUFFIX).unwrap_or(base);
    let mut attempt = 1;
    loop {
        let name = match attempt {
            1 => base.to_string(),
            n => format!("{stem}-{n}{OUTPUT_SUFFIX}"),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(ExperimentError::io(path)(e)),
        }
    }
}
