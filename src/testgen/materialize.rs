use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::testgen::extract::count_tests;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    /// Keep the file under the tests directory.
    #[default]
    Permanent,
    /// Write to the OS temp dir and remove after the run.
    Temporary,
}

#[derive(Debug, Clone)]
pub struct GeneratedTestFile {
    pub path: PathBuf,
    pub content: String,
    pub test_count: usize,
    pub mode: SaveMode,
}

impl GeneratedTestFile {
    /// Removes temporary files. Permanent files are left alone.
    pub fn cleanup(&self) -> io::Result<()> {
        if self.mode == SaveMode::Temporary && self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

pub fn test_file_name(stamp: DateTime<Local>) -> String {
    format!("test_generated_api_{}.py", stamp.format("%Y-%m-%d_%H-%M-%S"))
}

/// Where a file for `mode` lands, before any directory adjustment.
pub fn target_dir(tests_dir: &Path, mode: SaveMode) -> PathBuf {
    match mode {
        SaveMode::Permanent => tests_dir.to_path_buf(),
        SaveMode::Temporary => std::env::temp_dir(),
    }
}

/* ============================================================
   Public entry
   ============================================================ */

pub fn materialize_test(
    tests_dir: &Path,
    mode: SaveMode,
    code: &str,
    stamp: DateTime<Local>,
) -> Result<GeneratedTestFile> {
    let dir = target_dir(tests_dir, mode);
    fs::create_dir_all(&dir)?;

    let path = dir.join(test_file_name(stamp));
    fs::write(&path, code)?;

    let test_count = count_tests(code);
    log::info!("Saved {} test(s) to {}", test_count, path.display());

    Ok(GeneratedTestFile {
        path,
        content: code.to_string(),
        test_count,
        mode,
    })
}
