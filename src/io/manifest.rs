use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::common::{sha256_file, write_atomic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileHash {
    pub sha256: String,
}

/// Record of one pipeline run: what was asked for and what was written.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Manifest {
    pub version: String,
    pub target_year: i32,
    pub round: u8,
    pub counts: BTreeMap<String, usize>,
    /// Output file name (relative to the output directory) -> hash.
    pub files: BTreeMap<String, FileHash>,
}

impl Manifest {
    /// Hash every file in `files` (names relative to `dir`).
    pub(crate) fn new(
        dir: &Path,
        target_year: i32,
        round: u8,
        counts: BTreeMap<String, usize>,
        files: &[&str],
    ) -> Result<Self> {
        let files = files.iter()
            .map(|name| Ok((name.to_string(), FileHash { sha256: sha256_file(&dir.join(name))? })))
            .collect::<Result<_>>()?;
        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            target_year,
            round,
            counts,
            files,
        })
    }

    pub(crate) fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, |w| {
            serde_json::to_writer_pretty(w, self)
                .context("[io::manifest] Failed to serialize manifest")
        })
    }
}
