//! Corpus filenames and the utterance keys derived from them.

use std::path::Path;

use crate::error::{PrepError, Result};

/// The fields of a corpus filename, `speaker.repetition.wordId.ext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile<'a> {
    pub speaker: &'a str,
    pub repetition: &'a str,
    pub word_id: u32,
    pub ext: &'a str,
}

impl<'a> CorpusFile<'a> {
    pub fn parse(name: &'a str) -> Result<Self> {
        let fields: Vec<&str> = name.split('.').collect();
        let &[speaker, repetition, word_id, ext] = fields.as_slice() else {
            return Err(PrepError::malformed(
                name,
                format!("expected 4 dot-separated fields, found {}", fields.len()),
            ));
        };
        let word_id: u32 = word_id
            .parse()
            .map_err(|_| PrepError::malformed(name, format!("word id '{word_id}' is not a number")))?;
        Ok(Self {
            speaker,
            repetition,
            word_id,
            ext,
        })
    }
}

/// Looks up a 1-based word id.
pub fn transcript<'v>(vocabulary: &'v [String], word_id: u32, name: &str) -> Result<&'v str> {
    word_id
        .checked_sub(1)
        .and_then(|idx| vocabulary.get(idx as usize))
        .map(String::as_str)
        .ok_or_else(|| {
            PrepError::malformed(
                name,
                format!("word id {word_id} is outside 1..={}", vocabulary.len()),
            )
        })
}

/// The word id a decoding key ends with: `S01.02.07` -> 7.
pub fn trailing_word_id(key: &str) -> Result<u32> {
    let field = key.rsplit('.').next().unwrap_or(key);
    field
        .parse()
        .map_err(|_| PrepError::malformed(key, format!("trailing field '{field}' is not a word id")))
}

/// `{speaker}_{filename without extension}`, shared by every mapping file.
pub fn utterance_key(speaker: &str, file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{speaker}_{stem}")
}
