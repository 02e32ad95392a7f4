//! The preparation script. See "config.rs" for the corpus layout and defaults.
//!
//! A run splits the speakers, copies their recordings into `<base-dir>/<dataset>/data/{train,test}`,
//! writes the mapping files and the dictionary, and links in the recipe scripts from the archive.
//! Re-running with the same seed reproduces the same split.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kaldi_prep::PrepConfig;
use kaldi_prep::lexicon::CommandPhonemizer;
use kaldi_prep::prepare::CorpusPreparer;

#[derive(Parser, Debug)]
#[command(name = "kaldi-prep", version, about = "Prepare the isolated words corpus for Kaldi", long_about = None)]
struct Args {
    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the raw corpus, one directory per speaker
    #[arg(long)]
    source: Option<PathBuf>,

    /// Directory the dataset is created in, usually kaldi/egs
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Name of the dataset directory
    #[arg(long)]
    dataset: Option<String>,

    /// Seed of the speaker split
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of speakers used for training
    #[arg(long)]
    ratio: Option<f64>,

    /// Directory holding utils/, steps/, conf/ and the run scripts
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Phonemizer command; the corpus path is appended, e.g. `java -jar Phonemizer-1.0.jar`
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    phonemizer: Option<Vec<String>>,

    /// Print the speaker split and exit
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn into_config(self) -> Result<PrepConfig> {
        let mut config = match &self.config {
            Some(path) => PrepConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => PrepConfig::default(),
        };
        if let Some(source) = self.source {
            config.source_root = source;
        }
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ratio) = self.ratio {
            config.ratio = ratio;
        }
        if let Some(archive) = self.archive {
            config.archive_dir = Some(archive);
        }
        if let Some(mut command) = self.phonemizer.filter(|c| !c.is_empty()) {
            config.phonemizer.program = command.remove(0);
            config.phonemizer.args = command;
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
    let dry_run = args.dry_run;
    let config = args.into_config()?;

    let phonemizer = CommandPhonemizer::new(config.phonemizer.clone());
    let preparer = CorpusPreparer::new(&config, &phonemizer);

    if dry_run {
        let split = preparer.partition()?;
        let names = |ids: &[kaldi_prep::speakers::SpeakerId]| {
            ids.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ")
        };
        println!("train ({}): {}", split.train.len(), names(&split.train));
        println!("test ({}): {}", split.test.len(), names(&split.test));
        return Ok(());
    }

    let summary = preparer
        .run()
        .with_context(|| format!("preparing {}", config.out_dir().display()))?;

    println!("\n✅ Preparation complete! Output written to '{}'", config.out_dir().display());
    println!(
        "  - Speakers: {} train, {} test",
        summary.partition.train.len(),
        summary.partition.test.len()
    );
    println!("  - Files: {} train, {} test", summary.train_files, summary.test_files);
    println!("  - Lexicon: {}", summary.lexicon.display());
    println!("Total time elapsed: {:?}", start_time.elapsed());

    Ok(())
}
