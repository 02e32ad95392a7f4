//! One full preparation run, from the raw corpus to a runnable Kaldi recipe directory.

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::PrepConfig;
use crate::error::Result;
use crate::lexicon::{Phonemizer, build_lexicon};
use crate::locate::locate;
use crate::mapping::write_mapping_files;
use crate::materialize::materialize;
use crate::phones::write_phone_sets;
use crate::recipe::install_recipe;
use crate::speakers::{Partition, partition};

/// What a run produced.
#[derive(Debug, Clone)]
pub struct PrepSummary {
    pub partition: Partition,
    pub train_files: usize,
    pub test_files: usize,
    pub lexicon: PathBuf,
}

pub struct CorpusPreparer<'a> {
    config: &'a PrepConfig,
    phonemizer: &'a dyn Phonemizer,
}

impl<'a> CorpusPreparer<'a> {
    pub fn new(config: &'a PrepConfig, phonemizer: &'a dyn Phonemizer) -> Self {
        Self { config, phonemizer }
    }

    pub fn partition(&self) -> Result<Partition> {
        partition(
            &self.config.speaker_ids(),
            &self.config.excluded_speakers,
            self.config.ratio,
            self.config.seed,
        )
    }

    pub fn run(&self) -> Result<PrepSummary> {
        let config = self.config;
        let split = self.partition()?;
        info!(
            "Split {} speakers into {} train and {} test",
            split.train.len() + split.test.len(),
            split.train.len(),
            split.test.len()
        );

        // --- Directories ---
        let train_dir = config.train_dir();
        let test_dir = config.test_dir();
        let local_dir = config.local_dir();
        let dict_dir = config.dict_dir();
        for dir in [&train_dir, &test_dir, &local_dir, &dict_dir] {
            fs::create_dir_all(dir)?;
        }

        // --- Audio ---
        let word_ids = config.word_ids();
        let train_files = locate(&split.train, &word_ids, &config.source_root)?;
        let test_files = locate(&split.test, &word_ids, &config.source_root)?;
        materialize(&train_files, &config.source_root, &train_dir, "train")?;
        materialize(&test_files, &config.source_root, &test_dir, "test")?;

        // --- Mapping files ---
        for dir in [&train_dir, &test_dir] {
            write_mapping_files(dir, &config.gender, &config.vocabulary)?;
        }

        // --- Dictionary ---
        let lexicon = build_lexicon(&config.vocabulary, self.phonemizer, &local_dir)?;
        write_phone_sets(
            &dict_dir,
            &config.nonsilence_phones,
            &config.silence_phones,
            &config.optional_silence,
        )?;

        // --- Recipe ---
        match &config.archive_dir {
            Some(archive) => install_recipe(archive, &config.out_dir())?,
            None => warn!("No archive directory configured, skipping the recipe scripts"),
        }

        info!(
            "Prepared {} train and {} test files in {}",
            train_files.len(),
            test_files.len(),
            config.out_dir().display()
        );
        Ok(PrepSummary {
            partition: split,
            train_files: train_files.len(),
            test_files: test_files.len(),
            lexicon,
        })
    }
}
