//! Per-episode metrics as JSON lines
//!
//! One line per completed episode:
//!
//! ```text
//! {"episode":1,"total_reward":-1234.5,"episode_length":200}
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// 1-based episode index
    pub episode: usize,
    pub total_reward: f32,
    pub episode_length: usize,
}

/// Appends [`EpisodeRecord`]s to a file, one JSON object per line
pub struct MetricsWriter {
    writer: BufWriter<File>,
}

impl MetricsWriter {
    /// Open `path` for appending, creating it and its parent directory if needed
    pub fn append(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write(&mut self, record: &EpisodeRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for MetricsWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
