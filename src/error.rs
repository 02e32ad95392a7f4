//! Error types for corpus preparation and decoding.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    /// Split ratio outside of `[0, 1]`.
    #[error("ratio is a number between [0, 1] inclusively, got {0}")]
    InvalidRatio(f64),

    /// A filename that does not follow `speaker.repetition.wordId.ext`.
    #[error("malformed corpus filename '{name}': {reason}")]
    MalformedFilename { name: String, reason: String },

    /// A phone list that Kaldi requires to be non-empty.
    #[error("{0} can't be empty")]
    EmptyPhoneList(&'static str),

    /// A directory some step depends on is not there.
    #[error("missing directory: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The phonemizer produced a different number of lines than it was given.
    #[error("phonemizer output has {phonemes} lines but the corpus has {corpus}")]
    PhonemizerDesync { corpus: usize, phonemes: usize },

    /// An external program exited unsuccessfully or could not be parsed.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("audio error: {0}")]
    Audio(String),

    #[error("no audio files found under {}", .0.display())]
    NoAudio(PathBuf),

    #[error("unknown model '{0}', pass the model family explicitly")]
    UnknownModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("progress bar template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrepError {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        PrepError::MalformedFilename {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn tool(tool: &str, message: impl Into<String>) -> Self {
        PrepError::Tool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
