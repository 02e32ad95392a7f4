//! The corpus text and the pronunciation lexicon built from it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::config::PhonemizerConfig;
use crate::error::{PrepError, Result};
use crate::phones::tokenize;

pub const CORPUS_FILE: &str = "corpus.txt";
pub const LEXICON_FILE: &str = "lexicon.txt";

/// Entries every lexicon starts with.
pub const SILENCE_ENTRY: (&str, &str) = ("!SIL", "sil");
pub const UNKNOWN_ENTRY: (&str, &str) = ("<UNK>", "spn");

/// Turns a text file (one word per line) into a file of phoneme streams, line for line.
pub trait Phonemizer {
    /// Returns the path of the phoneme file it wrote.
    fn phonemize(&self, input: &Path) -> Result<PathBuf>;
}

/// Runs an external phonemizer, e.g. `java -jar Phonemizer-1.0.jar <corpus>`.
#[derive(Debug, Clone)]
pub struct CommandPhonemizer {
    config: PhonemizerConfig,
}

impl CommandPhonemizer {
    pub fn new(config: PhonemizerConfig) -> Self {
        Self { config }
    }
}

impl Phonemizer for CommandPhonemizer {
    fn phonemize(&self, input: &Path) -> Result<PathBuf> {
        debug!("Running {} {:?} {}", self.config.program, self.config.args, input.display());
        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(input)
            .output()?;
        if !output.status.success() {
            return Err(PrepError::tool(
                &self.config.program,
                format!("{}: {}", output.status, String::from_utf8_lossy(&output.stderr).trim()),
            ));
        }

        let mut phonemes = input.as_os_str().to_owned();
        phonemes.push(&self.config.output_suffix);
        Ok(PathBuf::from(phonemes))
    }
}

/// Writes `corpus.txt`, one vocabulary word per line.
pub fn write_corpus(local_dir: &Path, vocabulary: &[String]) -> Result<PathBuf> {
    let path = local_dir.join(CORPUS_FILE);
    let mut out = BufWriter::new(File::create(&path)?);
    for word in vocabulary {
        writeln!(out, "{word}")?;
    }
    out.flush()?;
    Ok(path)
}

/// Phonemizes `corpus.txt` and writes `dict/lexicon.txt`.
///
/// The corpus is (re)written from `vocabulary` first. The phoneme file is removed once the
/// lexicon is written.
pub fn build_lexicon(
    vocabulary: &[String],
    phonemizer: &dyn Phonemizer,
    local_dir: &Path,
) -> Result<PathBuf> {
    let corpus_path = write_corpus(local_dir, vocabulary)?;
    let phoneme_path = phonemizer.phonemize(&corpus_path)?;

    let corpus = fs::read_to_string(&corpus_path)?;
    let phonemes = fs::read_to_string(&phoneme_path)?;
    let words: Vec<&str> = corpus.lines().collect();
    let streams: Vec<&str> = phonemes.lines().collect();
    if words.len() != streams.len() {
        return Err(PrepError::PhonemizerDesync {
            corpus: words.len(),
            phonemes: streams.len(),
        });
    }

    let dict_dir = local_dir.join("dict");
    fs::create_dir_all(&dict_dir)?;
    let lexicon_path = dict_dir.join(LEXICON_FILE);
    let mut out = BufWriter::new(File::create(&lexicon_path)?);
    for (word, phone) in [SILENCE_ENTRY, UNKNOWN_ENTRY] {
        writeln!(out, "{word} {phone}")?;
    }
    for (word, stream) in words.iter().zip(streams) {
        writeln!(out, "{} {}", word.trim(), tokenize(stream).join(" "))?;
    }
    out.flush()?;

    fs::remove_file(&phoneme_path)?;
    info!("Wrote {} ({} words)", lexicon_path.display(), words.len());
    Ok(lexicon_path)
}
