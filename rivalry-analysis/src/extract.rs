use crate::error::{AnalysisError, Result};
use regex::Regex;
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<subject>[0-9]+)_(?P<session>[0-9]+)_.*_outputDict\.json$")
        .expect("file name pattern is valid")
});

static BUTTON_PRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^trial trial(?P<run>[0-9]+) event (?P<key>[a-z0-9]) at (?P<onset>[0-9]+\.[0-9]+)")
        .expect("button press pattern is valid")
});

pub const TABLE_HEADER: [&str; 5] = ["run", "key", "onset", "subject", "session"];

/// Default table name inside a data directory
pub const TABLE_FILE: &str = "behavior.tsv";

/// Subject and session as written in an event file's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMeta {
    pub subject: String,
    pub session: String,
}

impl SessionMeta {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let caps = FILE_NAME.captures(name)?;
        Some(Self {
            subject: caps["subject"].to_string(),
            session: caps["session"].to_string(),
        })
    }
}

/// One row of the behaviour table. Values keep the text they were logged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    pub run: String,
    pub key: String,
    pub onset: String,
    pub subject: String,
    pub session: String,
}

impl ButtonPress {
    fn fields(&self) -> [&str; 5] {
        [&self.run, &self.key, &self.onset, &self.subject, &self.session]
    }
}

fn event_text(event: &Value) -> String {
    match event {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Matches every event of every run against the key-press pattern.
///
/// `event_array` is the list of per-run event lists. A bare event at the top
/// level is treated as a run of its own. Non-matching events are dropped.
pub fn extract_button_presses(event_array: &Value, meta: &SessionMeta) -> Vec<ButtonPress> {
    let runs: &[Value] = match event_array {
        Value::Array(runs) => runs,
        _ => return Vec::new(),
    };

    runs.iter()
        .flat_map(|run| match run {
            Value::Array(events) => events.iter().collect::<Vec<_>>(),
            single => vec![single],
        })
        .filter_map(|event| {
            let text = event_text(event);
            let caps = BUTTON_PRESS.captures(&text)?;
            Some(ButtonPress {
                run: caps["run"].to_string(),
                key: caps["key"].to_string(),
                onset: caps["onset"].to_string(),
                subject: meta.subject.clone(),
                session: meta.session.clone(),
            })
        })
        .collect()
}

/// Reads one event file. Files whose name carries no subject and session are
/// rejected with [`AnalysisError::FileName`].
pub fn extract_file(path: &Path) -> Result<Vec<ButtonPress>> {
    let meta =
        SessionMeta::from_path(path).ok_or_else(|| AnalysisError::FileName(path.to_path_buf()))?;
    let content = std::fs::read(path).map_err(AnalysisError::io(path))?;
    let doc: Value = serde_json::from_slice(&content).map_err(|source| AnalysisError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let events = doc.get("event_array").unwrap_or(&Value::Null);
    let presses = extract_button_presses(events, &meta);
    debug!(path = %path.display(), presses = presses.len(), "event file read");
    Ok(presses)
}

/// JSON files directly inside `dir`, sorted by path.
pub fn event_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| AnalysisError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

pub fn write_table<W: Write>(mut out: W, presses: &[ButtonPress]) -> std::io::Result<()> {
    writeln!(out, "{}", TABLE_HEADER.join("\t"))?;
    for press in presses {
        writeln!(out, "{}", press.fields().join("\t"))?;
    }
    out.flush()
}

/// Collects the presses of every event file in `data_dir` into one table.
///
/// Writes to `output`, or `<data_dir>/behavior.tsv` when none is given, and
/// returns the table path with the row count.
pub fn extract_dir(data_dir: &Path, output: Option<&Path>) -> Result<(PathBuf, usize)> {
    let mut presses = Vec::new();
    for path in event_files(data_dir)? {
        if SessionMeta::from_path(&path).is_none() {
            warn!(path = %path.display(), "skipping file without subject/session in its name");
            continue;
        }
        presses.extend(extract_file(&path)?);
    }

    let table = output.map_or_else(|| data_dir.join(TABLE_FILE), Path::to_path_buf);
    let file = File::create(&table).map_err(AnalysisError::io(&table))?;
    write_table(BufWriter::new(file), &presses).map_err(AnalysisError::io(&table))?;
    info!(path = %table.display(), rows = presses.len(), "behaviour table written");
    Ok((table, presses.len()))
}
