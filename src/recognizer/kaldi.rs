//! A front end and decoder backed by the Kaldi command line tools.
//!
//! Matrices travel between the tools as text archives (`ark,t`), one utterance at a time,
//! through scratch files in a private temporary directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;
use tracing::{debug, warn};

use super::features::{FeatureMatrix, FeatureStage, FrontEnd, MfccOptions};
use super::{AsrEngine, Decoded};
use crate::config::RecognizerConfig;
use crate::error::{PrepError, Result};

// Every scratch archive holds a single utterance under this key.
const UTT: &str = "utt";

// Wide enough to cover a whole isolated-word recording, so the sliding window is the utterance mean.
const CMN_WINDOW: u32 = 10000;

/// Locates the Kaldi binaries, either in a fixed directory or on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct KaldiTools {
    bin_dir: Option<PathBuf>,
}

impl KaldiTools {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn command(&self, tool: &str) -> Command {
        match &self.bin_dir {
            Some(dir) => Command::new(dir.join(tool)),
            None => Command::new(tool),
        }
    }

    /// Runs `tool` and returns its stdout and stderr.
    fn run(&self, tool: &str, args: &[String]) -> Result<(String, String)> {
        debug!("{} {}", tool, args.join(" "));
        let output = self
            .command(tool)
            .args(args)
            .output()
            .map_err(|e| PrepError::tool(tool, e.to_string()))?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(PrepError::tool(tool, format!("{}: {}", output.status, stderr.trim())));
        }
        Ok((String::from_utf8_lossy(&output.stdout).into_owned(), stderr))
    }
}

/// Formats a matrix as a Kaldi text archive entry.
pub fn write_text_ark(key: &str, feats: &FeatureMatrix) -> String {
    let mut out = format!("{key}  [");
    for row in feats.rows() {
        out.push_str("\n ");
        for value in row {
            out.push(' ');
            out.push_str(&value.to_string());
        }
    }
    out.push_str(" ]\n");
    out
}

/// Parses the first matrix of a Kaldi text archive.
pub fn parse_text_ark(text: &str) -> Result<FeatureMatrix> {
    let start = text
        .find('[')
        .ok_or_else(|| PrepError::tool("ark,t", "no matrix found"))?;
    let end = text[start..]
        .find(']')
        .map(|i| start + i)
        .ok_or_else(|| PrepError::tool("ark,t", "unterminated matrix"))?;

    let mut rows = Vec::new();
    for line in text[start + 1..end].lines() {
        let row = line
            .split_whitespace()
            .map(|v| v.parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrepError::tool("ark,t", e.to_string()))?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    FeatureMatrix::from_rows(rows)
}

/// Total log-likelihood from a line like
/// `Log-like per frame for utterance utt is -8.21 over 95 frames.`
pub fn parse_likelihood(log: &str, key: &str) -> Option<f64> {
    let marker = format!("Log-like per frame for utterance {key} is ");
    let line = log.lines().find(|l| l.contains(&marker))?;
    let rest = &line[line.find(&marker)? + marker.len()..];
    let mut words = rest.split_whitespace();
    let per_frame: f64 = words.next()?.parse().ok()?;
    let frames: f64 = words.nth(1)?.parse().ok()?;
    Some(per_frame * frames)
}

pub struct KaldiFrontEnd {
    tools: KaldiTools,
    scratch: TempDir,
}

impl KaldiFrontEnd {
    pub fn new(tools: KaldiTools) -> Result<Self> {
        Ok(Self {
            tools,
            scratch: TempDir::new()?,
        })
    }

    fn write_feats(&self, feats: &FeatureMatrix) -> Result<PathBuf> {
        let path = self.scratch.path().join("feats.ark");
        fs::write(&path, write_text_ark(UTT, feats))?;
        Ok(path)
    }

    fn write_wav(&self, waveform: &[f32], sample_rate: u32) -> Result<PathBuf> {
        let path = self.scratch.path().join("utt.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let wav_err = |e: hound::Error| PrepError::Audio(e.to_string());
        let mut writer = WavWriter::create(&path, spec).map_err(wav_err)?;
        for &sample in waveform {
            let scaled = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer.write_sample(scaled).map_err(wav_err)?;
        }
        writer.finalize().map_err(wav_err)?;
        Ok(path)
    }
}

impl FrontEnd for KaldiFrontEnd {
    fn compute_features(
        &mut self,
        waveform: &[f32],
        sample_rate: u32,
        opts: &MfccOptions,
    ) -> Result<FeatureMatrix> {
        let wav = self.write_wav(waveform, sample_rate)?;
        let scp = self.scratch.path().join("wav.scp");
        fs::write(&scp, format!("{UTT} {}\n", wav.display()))?;

        let args = vec![
            format!("--sample-frequency={}", opts.sample_frequency),
            format!("--use-energy={}", opts.use_energy),
            format!("--allow-downsample={}", opts.allow_downsample),
            format!("scp:{}", scp.display()),
            "ark,t:-".to_string(),
        ];
        let (stdout, _) = self.tools.run("compute-mfcc-feats", &args)?;
        parse_text_ark(&stdout)
    }

    fn apply(&mut self, stage: &FeatureStage, feats: FeatureMatrix) -> Result<FeatureMatrix> {
        let input = self.write_feats(&feats)?;
        let (tool, mut args) = match stage {
            FeatureStage::Cmvn => (
                "apply-cmvn-sliding",
                vec![
                    "--center=true".to_string(),
                    "--norm-vars=false".to_string(),
                    format!("--cmn-window={CMN_WINDOW}"),
                ],
            ),
            FeatureStage::Deltas { order, window } => (
                "add-deltas",
                vec![format!("--delta-order={order}"), format!("--delta-window={window}")],
            ),
            FeatureStage::Splice { left, right } => (
                "splice-feats",
                vec![format!("--left-context={left}"), format!("--right-context={right}")],
            ),
            FeatureStage::Transform(matrix) => ("transform-feats", vec![matrix.display().to_string()]),
        };
        args.push(format!("ark,t:{}", input.display()));
        args.push("ark,t:-".to_string());

        let (stdout, _) = self.tools.run(tool, &args)?;
        parse_text_ark(&stdout)
    }
}

/// Reads `words.txt`, mapping word ids to words.
fn read_word_table(path: &Path) -> Result<HashMap<u32, String>> {
    let data = fs::read_to_string(path)?;
    let mut table = HashMap::new();
    for line in data.lines() {
        let mut fields = line.split_whitespace();
        if let (Some(word), Some(id)) = (fields.next(), fields.next()) {
            let id = id
                .parse()
                .map_err(|_| PrepError::tool("words.txt", format!("bad line '{line}'")))?;
            table.insert(id, word.to_string());
        }
    }
    Ok(table)
}

/// Decodes with `gmm-latgen-faster` against `final.mdl` and `graph/HCLG.fst`.
pub struct KaldiDecoder {
    tools: KaldiTools,
    scratch: TempDir,
    model: PathBuf,
    graph: PathBuf,
    words: HashMap<u32, String>,
    options: Vec<String>,
}

impl KaldiDecoder {
    pub fn from_config(config: &RecognizerConfig, tools: KaldiTools) -> Result<Self> {
        let model_path = config.model_path();
        let graph_dir = model_path.join("graph");
        for dir in [&model_path, &graph_dir] {
            if !dir.is_dir() {
                return Err(PrepError::MissingDirectory(dir.clone()));
            }
        }
        let words_path = graph_dir.join("words.txt");

        Ok(Self {
            tools,
            scratch: TempDir::new()?,
            model: model_path.join("final.mdl"),
            graph: graph_dir.join("HCLG.fst"),
            words: read_word_table(&words_path)?,
            options: vec![
                format!("--beam={}", config.beam),
                format!("--max-active={}", config.max_active),
                format!("--lattice-beam={}", config.lattice_beam),
                format!("--acoustic-scale={}", config.acoustic_scale),
                format!("--word-symbol-table={}", words_path.display()),
            ],
        })
    }

    fn words_for(&self, line: &str) -> String {
        line.split_whitespace()
            .skip(1)
            .filter_map(|id| id.parse::<u32>().ok())
            .map(|id| self.words.get(&id).map_or("<UNK>", String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AsrEngine for KaldiDecoder {
    fn decode(&mut self, features: &FeatureMatrix) -> Result<Decoded> {
        let feats = self.scratch.path().join("feats.ark");
        fs::write(&feats, write_text_ark(UTT, features))?;
        let lattice = self.scratch.path().join("lat.ark");

        let mut args = self.options.clone();
        args.extend([
            self.model.display().to_string(),
            self.graph.display().to_string(),
            format!("ark,t:{}", feats.display()),
            format!("ark:{}", lattice.display()),
            "ark,t:-".to_string(),
        ]);
        let (stdout, stderr) = self.tools.run("gmm-latgen-faster", &args)?;

        let text = stdout
            .lines()
            .find(|l| l.split_whitespace().next() == Some(UTT))
            .map(|l| self.words_for(l))
            .unwrap_or_default();
        let likelihood = parse_likelihood(&stderr, UTT).unwrap_or_else(|| {
            warn!("No likelihood reported, the decoder likely found no final state");
            f64::NEG_INFINITY
        });

        Ok(Decoded { text, likelihood })
    }
}
