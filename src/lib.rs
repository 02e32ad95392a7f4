//! Prepares the Arabic Corpus of Isolated Words for Kaldi and scores trained models on it.
//!
//! Preparation is a one-shot run (see [`prepare::CorpusPreparer`]): split the speakers, copy
//! their recordings into `data/train` and `data/test`, write the mapping files Kaldi reads,
//! and build the lexicon and phone sets of `data/local/dict`. Decoding goes through
//! [`recognizer::Recognizer`], which hands features to an external engine.

pub mod audio;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod locate;
pub mod mapping;
pub mod materialize;
pub mod phones;
pub mod prepare;
pub mod recipe;
pub mod recognizer;
pub mod speakers;
pub mod utterance;

mod progress;

pub use config::{PrepConfig, RecognizerConfig};
pub use error::{PrepError, Result};
