//! Decoding recordings with a trained model and scoring the result.
//!
//! The word a recording contains is known from its name (`S01.02.07.wav` is word 7), so a
//! decoding run doubles as an accuracy check of the model.

pub mod features;
pub mod kaldi;
pub mod transcription;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::audio;
use crate::config::RecognizerConfig;
use crate::error::{PrepError, Result};
use crate::progress::progress_bar;
use crate::utterance::{trailing_word_id, transcript};

pub use features::{FeatureMatrix, FeaturePipeline, FeatureStage, FrontEnd, MfccOptions, ModelFamily};
pub use transcription::{Transcription, TranscriptionEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub text: String,
    pub likelihood: f64,
}

/// Decodes a feature matrix into words.
pub trait AsrEngine {
    fn decode(&mut self, features: &FeatureMatrix) -> Result<Decoded>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceResult {
    pub id: String,
    pub true_word: String,
    pub predicted: String,
    pub likelihood: f64,
}

impl UtteranceResult {
    pub fn is_correct(&self) -> bool {
        self.true_word == self.predicted
    }
}

pub const REPORT_HEADER: &str = "Filename,TrueWord,Predicted,Likelihood";

/// Fraction of results whose prediction matches the truth, 0 for no results.
pub fn accuracy(results: &[UtteranceResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let correct = results.iter().filter(|r| r.is_correct()).count();
    correct as f64 / results.len() as f64
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub results: Vec<UtteranceResult>,
    pub accuracy: f64,
}

impl Evaluation {
    pub fn new(results: Vec<UtteranceResult>) -> Self {
        let accuracy = accuracy(&results);
        Self { results, accuracy }
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{REPORT_HEADER}")?;
        for r in &self.results {
            writeln!(
                out,
                "{},{},{},{}",
                csv_field(&r.id),
                csv_field(&r.true_word),
                csv_field(&r.predicted),
                r.likelihood
            )?;
        }
        out.flush()?;
        Ok(())
    }

    /// Writes `<dir>/<model_name>_decoded.csv` when more than one utterance was decoded.
    pub fn write_report(&self, dir: &Path, model_name: &str) -> Result<Option<PathBuf>> {
        if self.results.len() <= 1 {
            return Ok(None);
        }
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{model_name}_decoded.csv"));
        self.write_csv(&path)?;
        info!("Wrote {} rows to {}", self.results.len(), path.display());
        Ok(Some(path))
    }
}

/// Runs recordings through a feature pipeline and an engine, one model at a time.
pub struct Recognizer<F, E> {
    config: RecognizerConfig,
    pipeline: FeaturePipeline,
    front_end: F,
    engine: E,
}

impl<F: FrontEnd, E: AsrEngine> Recognizer<F, E> {
    pub fn new(config: RecognizerConfig, front_end: F, engine: E) -> Result<Self> {
        let family = config.family()?;
        let pipeline = FeaturePipeline::for_family(family, &config.model_path(), config.sample_rate);
        debug!("Using {:?} features for {}", family, config.model_name);
        Ok(Self {
            config,
            pipeline,
            front_end,
            engine,
        })
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Decodes a single recording, or every recording in a directory.
    pub fn evaluate(&mut self, input: &Path) -> Result<Evaluation> {
        let transcription = Transcription::from_path(input)?;
        self.evaluate_transcription(&transcription, input)
    }

    /// Decodes every entry of `transcription`, which was read from `source`.
    pub fn evaluate_transcription(
        &mut self,
        transcription: &Transcription,
        source: &Path,
    ) -> Result<Evaluation> {
        if transcription.is_empty() {
            return Err(PrepError::NoAudio(source.to_path_buf()));
        }

        let pb = progress_bar(transcription.len(), &self.config.model_name)?;
        let mut results = Vec::with_capacity(transcription.len());

        for entry in &transcription.entries {
            results.push(self.decode_entry(entry)?);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let evaluation = Evaluation::new(results);
        info!(
            "{}: {} utterances, accuracy {:.4}",
            self.config.model_name,
            evaluation.results.len(),
            evaluation.accuracy
        );
        Ok(evaluation)
    }

    fn decode_entry(&mut self, entry: &TranscriptionEntry) -> Result<UtteranceResult> {
        let word_id = trailing_word_id(&entry.key)?;
        let true_word = transcript(&self.config.vocabulary, word_id, &entry.key)?.to_string();

        let samples = audio::load(&entry.path, self.config.sample_rate)?;
        let feats = self
            .pipeline
            .run(&mut self.front_end, &samples, self.config.sample_rate)?;
        let decoded = self.engine.decode(&feats)?;
        debug!("{} -> {} ({})", entry.key, decoded.text, decoded.likelihood);

        Ok(UtteranceResult {
            id: entry.key.clone(),
            true_word,
            predicted: decoded.text.trim().to_string(),
            likelihood: decoded.likelihood,
        })
    }
}
