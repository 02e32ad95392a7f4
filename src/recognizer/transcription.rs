//! The list of recordings to decode.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{PrepError, Result};
use crate::mapping::read_table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionEntry {
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcription {
    pub entries: Vec<TranscriptionEntry>,
}

fn sorted_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.collect::<std::result::Result<_, _>>()?;
    paths.retain(|p| p.is_file());
    paths.sort();
    Ok(paths)
}

impl Transcription {
    /// Builds the list from a single file or a directory of `*.wav` files.
    ///
    /// A directory without wavs of its own is searched one level deeper, so both a speaker
    /// directory and a whole split directory work. Anything that is not a wav is skipped.
    pub fn from_path(path: &Path) -> Result<Self> {
        let paths = if path.is_dir() {
            let root = Pattern::escape(&path.to_string_lossy());
            let direct = sorted_glob(&format!("{root}/*.wav"))?;
            if direct.is_empty() {
                sorted_glob(&format!("{root}/*/*.wav"))?
            } else {
                direct
            }
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(PrepError::NoAudio(path.to_path_buf()));
        };

        let entries = paths
            .into_iter()
            .map(|path| TranscriptionEntry {
                key: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path,
            })
            .collect();
        Ok(Self { entries })
    }

    /// Reads a `wav.scp` style file of `<key> <path>` lines.
    pub fn read_scp(path: &Path) -> Result<Self> {
        let entries = read_table(path)?
            .into_iter()
            .map(|(key, path)| TranscriptionEntry {
                key,
                path: PathBuf::from(path),
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn write_scp(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writeln!(out, "{} {}", entry.key, entry.path.display())?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
