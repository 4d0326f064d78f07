//! Post-processing of saved event arrays into a behaviour table.
//!
//! Two steps: [`normalize`] rewrites event files with `\n` line endings, and
//! [`extract`] pulls every logged key press out of them.

pub mod error;
pub mod extract;
pub mod normalize;

pub use error::{AnalysisError, Result};
pub use extract::{
    ButtonPress, SessionMeta, event_files, extract_button_presses, extract_dir, extract_file,
    write_table,
};
pub use normalize::{normalize_dir, normalize_file, normalize_line_endings};
