use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use kaldi_prep::RecognizerConfig;
use kaldi_prep::recognizer::kaldi::{KaldiDecoder, KaldiFrontEnd, KaldiTools};
use kaldi_prep::recognizer::{ModelFamily, Recognizer, Transcription};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FamilyArg {
    /// MFCC + CMVN + deltas
    Mono,
    /// MFCC + CMVN, spliced and transformed with final.mat
    Transform,
}

impl From<FamilyArg> for ModelFamily {
    fn from(v: FamilyArg) -> Self {
        match v {
            FamilyArg::Mono => ModelFamily::Mono,
            FamilyArg::Transform => ModelFamily::Transform,
        }
    }
}

/// Decode recordings with a trained model and score them against their filenames
#[derive(Parser, Debug)]
#[command(name = "kaldi-decode", version, about, long_about = None)]
struct Args {
    /// A wav file, a directory of wav files, or a `<key> <path>` list with --scp
    input: PathBuf,

    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// The recipe's exp directory
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Experiment name, e.g. mono, tri1, tri3a
    #[arg(long)]
    model_name: Option<String>,

    /// Feature family, when it can't be told from the model name
    #[arg(long, value_enum)]
    family: Option<FamilyArg>,

    /// Directory holding the Kaldi binaries, if they are not on PATH
    #[arg(long)]
    kaldi_bin: Option<PathBuf>,

    /// Where to write <model>_decoded.csv
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Treat the input as a wav.scp style list
    #[arg(long)]
    scp: bool,
}

impl Args {
    fn config(&self) -> Result<RecognizerConfig> {
        let mut config = match &self.config {
            Some(path) => RecognizerConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => RecognizerConfig::default(),
        };
        if let Some(model_dir) = &self.model_dir {
            config.model_dir = model_dir.clone();
        }
        if let Some(model_name) = &self.model_name {
            config.model_name = model_name.clone();
        }
        if let Some(family) = self.family {
            config.family = Some(family.into());
        }
        if let Some(kaldi_bin) = &self.kaldi_bin {
            config.kaldi_bin = Some(kaldi_bin.clone());
        }
        if let Some(report_dir) = &self.report_dir {
            config.report_dir = report_dir.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let start_time = Instant::now();
    let args = Args::parse();
    let config = args.config()?;

    let tools = KaldiTools::new(config.kaldi_bin.clone());
    let front_end = KaldiFrontEnd::new(tools.clone())?;
    let engine = KaldiDecoder::from_config(&config, tools)
        .with_context(|| format!("loading model {}", config.model_path().display()))?;
    let mut recognizer = Recognizer::new(config, front_end, engine)?;

    let evaluation = if args.scp {
        let transcription = Transcription::read_scp(&args.input)
            .with_context(|| format!("reading {}", args.input.display()))?;
        recognizer.evaluate_transcription(&transcription, &args.input)?
    } else {
        recognizer.evaluate(&args.input)?
    };

    let config = recognizer.config();
    match evaluation.write_report(&config.report_dir, &config.model_name)? {
        Some(path) => {
            println!("Decoded {} utterances with {}", evaluation.results.len(), config.model_name);
            println!("  - Accuracy: {:.2}%", evaluation.accuracy * 100.0);
            println!("  - Details: {}", path.display());
        }
        None => {
            if let Some(r) = evaluation.results.first() {
                println!("{} {} (likelihood {})", r.id, r.predicted, r.likelihood);
            }
        }
    }
    println!("Total time elapsed: {:?}", start_time.elapsed());

    Ok(())
}
