//! The per-split mapping files Kaldi reads: `spk2gender`, `wav.scp`, `text` and `utt2spk`.
//!
//! Every file is keyed by the utterance id `<speaker>_<filename without extension>` and
//! sorted by speaker then filename, which is the order Kaldi's `validate_data_dir.sh`
//! expects under `LC_ALL=C`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::speakers::is_speaker_name;
use crate::utterance::{CorpusFile, transcript, utterance_key};

pub const SPK2GENDER: &str = "spk2gender";
pub const WAV_SCP: &str = "wav.scp";
pub const TEXT: &str = "text";
pub const UTT2SPK: &str = "utt2spk";

/// Sorted names of the subdirectories of `dir`.
fn sorted_subdirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Every recording in the speaker directories of `split_dir`, as `(speaker, path)`,
/// sorted by speaker then filename.
fn speaker_files(split_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for speaker in sorted_subdirs(split_dir)?.into_iter().filter(|s| is_speaker_name(s)) {
        let mut paths = Vec::new();
        for entry in fs::read_dir(split_dir.join(&speaker))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        files.extend(paths.into_iter().map(|p| (speaker.clone(), p)));
    }
    Ok(files)
}

fn write_lines(path: PathBuf, lines: impl IntoIterator<Item = String>) -> Result<()> {
    let mut out = BufWriter::new(File::create(&path)?);
    let mut count = 0;
    for line in lines {
        writeln!(out, "{line}")?;
        count += 1;
    }
    out.flush()?;
    info!("Wrote {} ({} lines)", path.display(), count);
    Ok(())
}

/// `<speaker> <gender>` for every `S<digits>` speaker directory.
pub fn write_spk2gender(split_dir: &Path, gender: &str) -> Result<()> {
    let lines = sorted_subdirs(split_dir)?
        .into_iter()
        .filter(|s| is_speaker_name(s))
        .map(|speaker| format!("{speaker} {gender}"));
    write_lines(split_dir.join(SPK2GENDER), lines)
}

/// `<utterance> <absolute path>`.
pub fn write_wav_scp(split_dir: &Path) -> Result<()> {
    let split_dir = std::path::absolute(split_dir)?;
    let lines = speaker_files(&split_dir)?
        .into_iter()
        .map(|(speaker, path)| format!("{} {}", utterance_key(&speaker, &path), path.display()));
    write_lines(split_dir.join(WAV_SCP), lines)
}

/// `<utterance> <transcript>`, with the transcript looked up from the filename's word id.
pub fn write_text(split_dir: &Path, vocabulary: &[String]) -> Result<()> {
    let mut lines = Vec::new();
    for (speaker, path) in speaker_files(split_dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = CorpusFile::parse(&name)?;
        let word = transcript(vocabulary, file.word_id, &name)?;
        lines.push(format!("{} {}", utterance_key(&speaker, &path), word));
    }
    write_lines(split_dir.join(TEXT), lines)
}

/// `<utterance> <speaker>`.
pub fn write_utt2spk(split_dir: &Path) -> Result<()> {
    let lines = speaker_files(split_dir)?
        .into_iter()
        .map(|(speaker, path)| format!("{} {}", utterance_key(&speaker, &path), speaker));
    write_lines(split_dir.join(UTT2SPK), lines)
}

/// Writes all four mapping files into `split_dir`.
pub fn write_mapping_files(split_dir: &Path, gender: &str, vocabulary: &[String]) -> Result<()> {
    write_spk2gender(split_dir, gender)?;
    write_wav_scp(split_dir)?;
    write_text(split_dir, vocabulary)?;
    write_utt2spk(split_dir)
}

/// Reads a `<key> <value>` table back, in file order.
pub fn read_table(path: &Path) -> Result<Vec<(String, String)>> {
    let data = fs::read_to_string(path)?;
    Ok(data
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once(' ') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn vocab() -> Vec<String> {
        ["صفر", "واحد", "إثنان"].iter().map(|w| w.to_string()).collect()
    }

    fn split_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (speaker, name) in [
            ("S02", "S02.01.03.wav"),
            ("S01", "S01.02.01.wav"),
            ("S01", "S01.01.02.wav"),
            ("S01", "S01.01.01.wav"),
        ] {
            let dir = temp_dir.path().join(speaker);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(name), b"RIFF").unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_spk2gender() {
        let temp_dir = split_dir();
        write_spk2gender(temp_dir.path(), "m").unwrap();
        let data = fs::read_to_string(temp_dir.path().join(SPK2GENDER)).unwrap();
        assert_eq!(data, "S01 m\nS02 m\n");
    }

    #[test]
    fn test_text_uses_one_based_word_ids() {
        let temp_dir = split_dir();
        write_text(temp_dir.path(), &vocab()).unwrap();
        let data = fs::read_to_string(temp_dir.path().join(TEXT)).unwrap();
        assert_eq!(
            data,
            "S01_S01.01.01 صفر\nS01_S01.01.02 واحد\nS01_S01.02.01 صفر\nS02_S02.01.03 إثنان\n"
        );
    }

    #[test]
    fn test_text_rejects_unknown_word() {
        let temp_dir = split_dir();
        fs::write(temp_dir.path().join("S02/S02.01.09.wav"), b"RIFF").unwrap();
        assert!(write_text(temp_dir.path(), &vocab()).is_err());
    }

    #[test]
    fn test_wav_scp_paths_are_absolute() {
        let temp_dir = split_dir();
        write_wav_scp(temp_dir.path()).unwrap();
        let table = read_table(&temp_dir.path().join(WAV_SCP)).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table[0].0, "S01_S01.01.01");
        for (_, path) in &table {
            assert!(Path::new(path).is_absolute());
            assert!(Path::new(path).is_file());
        }
    }

    #[test]
    fn test_non_speaker_dirs_are_ignored() {
        let temp_dir = split_dir();
        fs::create_dir_all(temp_dir.path().join("logs")).unwrap();
        fs::write(temp_dir.path().join("logs/run.log"), b"").unwrap();
        write_utt2spk(temp_dir.path()).unwrap();
        let table = read_table(&temp_dir.path().join(UTT2SPK)).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.iter().all(|(_, speaker)| speaker.starts_with('S')));

        write_spk2gender(temp_dir.path(), "m").unwrap();
        let data = fs::read_to_string(temp_dir.path().join(SPK2GENDER)).unwrap();
        assert_eq!(data, "S01 m\nS02 m\n");
    }

    #[test]
    fn test_keys_agree_across_files() {
        let temp_dir = split_dir();
        write_mapping_files(temp_dir.path(), "m", &vocab()).unwrap();

        let scp = read_table(&temp_dir.path().join(WAV_SCP)).unwrap();
        let text = read_table(&temp_dir.path().join(TEXT)).unwrap();
        let utt2spk = read_table(&temp_dir.path().join(UTT2SPK)).unwrap();

        let text_keys: HashMap<_, _> = text.iter().cloned().collect();
        let spk: HashMap<_, _> = utt2spk.iter().cloned().collect();
        assert_eq!(text_keys.len(), text.len());
        assert_eq!(spk.len(), utt2spk.len());

        for (key, _) in &scp {
            assert!(text_keys.contains_key(key));
            let speaker = &spk[key];
            assert!(key.starts_with(&format!("{speaker}_")));
        }
        assert_eq!(scp.len(), text.len());
        assert_eq!(scp.len(), utt2spk.len());
    }
}
