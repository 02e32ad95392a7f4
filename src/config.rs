//! Configuration for how to prepare the corpus and how to decode with the trained models.
//!
//! The defaults describe the "Arabic Corpus of Isolated Words": 50 speakers (`S01`..`S50`),
//! each recording every one of 20 words several times. Files are named
//! `speaker.repetition.wordId.wav`, e.g. `S07.03.12.wav`, and live under `<source>/<speaker>/`.
//!
//! Speakers 11, 36 and 44 are female and are left out so the prepared data only holds
//! male speakers, which is why `spk2gender` marks everyone as `m`.
//!
//! Make sure to point `source_root` and `base_dir` at your own paths before running! `base_dir`
//! must be the `egs` directory of your Kaldi checkout, since the recipe scripts find the Kaldi
//! binaries relative to it.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::recognizer::ModelFamily;

pub const SPEAKER_COUNT: u32 = 50;

pub const FEMALE_SPEAKERS: [u32; 3] = [11, 36, 44];

pub const SPLIT_RATIO: f64 = 0.8;

pub const SAMPLE_RATE: u32 = 16000;

// In the order of their ids, so word id 1 is "صفر".
pub const WORDS: [&str; 20] = [
    "صفر", "واحد", "إثنان", "ثلاثة", "أربعة", "خمسة", "ستة", "سبعة", "ثمانية", "تسعة",
    "التنشيط", "التحويل", "الرصيد", "التسديد", "نعم", "لا", "التمويل", "البيانات", "الحساب",
    "إنهاء",
];

/// The phone set the phonemizer writes its output in.
pub const NONSILENCE_PHONES: [&str; 26] = [
    "$", "@", "A", "P", "R", "S", "T", "a", "a2", "b", "d", "f", "h", "i", "i2", "l", "m", "n",
    "r", "s", "t", "w", "x", "y", "¥", "€",
];

pub const SILENCE_PHONES: [&str; 2] = ["sil", "spn"];

pub const OPTIONAL_SILENCE: [&str; 1] = ["sil"];

/// Maps Kaldi's conventional experiment names to the features the model was trained on.
///
/// `mono` and `tri1` are trained on deltas, everything after `tri2` on spliced frames
/// projected through `final.mat` (LDA+MLLT, optionally SAT).
pub const MODEL_FAMILIES: phf::Map<&'static str, ModelFamily> = phf_map! {
    "mono" => ModelFamily::Mono,
    "mono0a" => ModelFamily::Mono,
    "tri1" => ModelFamily::Mono,
    "tri2" => ModelFamily::Transform,
    "tri2b" => ModelFamily::Transform,
    "tri3" => ModelFamily::Transform,
    "tri3a" => ModelFamily::Transform,
    "tri3b" => ModelFamily::Transform,
    "tri4" => ModelFamily::Transform,
    "tri4a" => ModelFamily::Transform,
    "tri4b" => ModelFamily::Transform,
};

/// How to run the external phonemizer.
///
/// The corpus path is appended to `args`, and the phonemes are expected next to it at
/// `<corpus><output_suffix>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhonemizerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub output_suffix: String,
}

impl Default for PhonemizerConfig {
    fn default() -> Self {
        Self {
            program: "java".into(),
            args: vec!["-jar".into(), "Phonemizer-1.0.jar".into()],
            output_suffix: ".ph".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrepConfig {
    /// Root of the raw corpus, holding one directory per speaker.
    pub source_root: PathBuf,
    /// Directory the dataset directory is created in, usually `kaldi/egs`.
    pub base_dir: PathBuf,
    /// Name of the dataset directory inside `base_dir`.
    pub dataset: String,
    pub speaker_count: u32,
    pub excluded_speakers: BTreeSet<u32>,
    pub gender: String,
    /// Transcripts, where word id `n` in a filename is `vocabulary[n - 1]`.
    pub vocabulary: Vec<String>,
    pub excluded_words: BTreeSet<u32>,
    pub ratio: f64,
    pub seed: u64,
    pub nonsilence_phones: Vec<String>,
    pub silence_phones: Vec<String>,
    pub optional_silence: Vec<String>,
    pub phonemizer: PhonemizerConfig,
    /// Holds the recipe scaffolding (`utils`, `steps`, `conf`, `run_*.sh`, ...).
    pub archive_dir: Option<PathBuf>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("data/Arabic_Corpus_of_Isolated_Words"),
            base_dir: PathBuf::from("kaldi/egs"),
            dataset: "ist".into(),
            speaker_count: SPEAKER_COUNT,
            excluded_speakers: FEMALE_SPEAKERS.into_iter().collect(),
            gender: "m".into(),
            vocabulary: WORDS.iter().map(|w| w.to_string()).collect(),
            excluded_words: BTreeSet::new(),
            ratio: SPLIT_RATIO,
            seed: 0,
            nonsilence_phones: NONSILENCE_PHONES.iter().map(|p| p.to_string()).collect(),
            silence_phones: SILENCE_PHONES.iter().map(|p| p.to_string()).collect(),
            optional_silence: OPTIONAL_SILENCE.iter().map(|p| p.to_string()).collect(),
            phonemizer: PhonemizerConfig::default(),
            archive_dir: None,
        }
    }
}

impl PrepConfig {
    /// Reads a JSON config. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.base_dir.join(&self.dataset)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.out_dir().join("data")
    }

    pub fn train_dir(&self) -> PathBuf {
        self.data_dir().join("train")
    }

    pub fn test_dir(&self) -> PathBuf {
        self.data_dir().join("test")
    }

    pub fn local_dir(&self) -> PathBuf {
        self.data_dir().join("local")
    }

    pub fn dict_dir(&self) -> PathBuf {
        self.local_dir().join("dict")
    }

    pub fn speaker_ids(&self) -> BTreeSet<u32> {
        (1..=self.speaker_count).collect()
    }

    /// Word ids that are not excluded, ascending.
    pub fn word_ids(&self) -> Vec<u32> {
        (1..=self.vocabulary.len() as u32)
            .filter(|id| !self.excluded_words.contains(id))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognizerConfig {
    /// The `exp` directory of the recipe.
    pub model_dir: PathBuf,
    /// One of Kaldi's experiment names, e.g. `mono` or `tri1`.
    pub model_name: String,
    /// Overrides the family looked up from `model_name`.
    pub family: Option<ModelFamily>,
    pub beam: f32,
    pub max_active: u32,
    pub lattice_beam: f32,
    pub acoustic_scale: f32,
    pub sample_rate: u32,
    /// Where the Kaldi binaries live. Looked up on `PATH` when unset.
    pub kaldi_bin: Option<PathBuf>,
    pub vocabulary: Vec<String>,
    pub report_dir: PathBuf,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("exp"),
            model_name: "tri1".into(),
            family: None,
            beam: 11.0,
            max_active: 7000,
            lattice_beam: 6.0,
            acoustic_scale: 0.1,
            sample_rate: SAMPLE_RATE,
            kaldi_bin: None,
            vocabulary: WORDS.iter().map(|w| w.to_string()).collect(),
            report_dir: PathBuf::from("."),
        }
    }
}

impl RecognizerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// `<model_dir>/<model_name>`, holding `final.mdl` and `graph/`.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    pub fn family(&self) -> Result<ModelFamily> {
        match self.family {
            Some(family) => Ok(family),
            None => MODEL_FAMILIES
                .get(self.model_name.as_str())
                .copied()
                .ok_or_else(|| crate::PrepError::UnknownModel(self.model_name.clone())),
        }
    }
}
