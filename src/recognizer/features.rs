//! Feature matrices and the feature pipelines the trained models expect.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

/// Which features a model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// MFCC + CMVN + deltas (`mono`, `tri1`).
    Mono,
    /// MFCC + CMVN, spliced and projected through `final.mat` (`tri2` onwards).
    Transform,
}

/// A row-major matrix of frames by feature dimensions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(PrepError::Audio("feature rows differ in length".into()));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // `chunks(0)` panics, and an empty matrix has no rows anyway.
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MfccOptions {
    pub sample_frequency: u32,
    pub use_energy: bool,
    pub allow_downsample: bool,
}

impl MfccOptions {
    pub fn new(sample_frequency: u32) -> Self {
        Self {
            sample_frequency,
            use_energy: false,
            allow_downsample: true,
        }
    }
}

/// A transform applied to the MFCCs, in pipeline order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureStage {
    /// Per-utterance cepstral mean normalization.
    Cmvn,
    Deltas { order: u32, window: u32 },
    Splice { left: u32, right: u32 },
    /// Multiplies each frame by the matrix stored at this path.
    Transform(PathBuf),
}

/// Computes MFCCs and applies feature transforms, e.g. through Kaldi's feature binaries.
pub trait FrontEnd {
    fn compute_features(
        &mut self,
        waveform: &[f32],
        sample_rate: u32,
        opts: &MfccOptions,
    ) -> Result<FeatureMatrix>;

    fn apply(&mut self, stage: &FeatureStage, feats: FeatureMatrix) -> Result<FeatureMatrix>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePipeline {
    pub mfcc: MfccOptions,
    pub stages: Vec<FeatureStage>,
}

impl FeaturePipeline {
    /// The pipeline for `family`. `model_path` is the experiment directory holding `final.mat`.
    pub fn for_family(family: ModelFamily, model_path: &Path, sample_rate: u32) -> Self {
        let stages = match family {
            ModelFamily::Mono => vec![
                FeatureStage::Cmvn,
                FeatureStage::Deltas { order: 2, window: 2 },
            ],
            ModelFamily::Transform => vec![
                FeatureStage::Cmvn,
                FeatureStage::Splice { left: 3, right: 3 },
                FeatureStage::Transform(model_path.join("final.mat")),
            ],
        };
        Self {
            mfcc: MfccOptions::new(sample_rate),
            stages,
        }
    }

    pub fn run(
        &self,
        front_end: &mut dyn FrontEnd,
        waveform: &[f32],
        sample_rate: u32,
    ) -> Result<FeatureMatrix> {
        let mut feats = front_end.compute_features(waveform, sample_rate, &self.mfcc)?;
        for stage in &self.stages {
            feats = front_end.apply(stage, feats)?;
        }
        Ok(feats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the stages it was asked to run.
    #[derive(Default)]
    struct TraceFrontEnd {
        calls: Vec<String>,
    }

    impl FrontEnd for TraceFrontEnd {
        fn compute_features(
            &mut self,
            waveform: &[f32],
            sample_rate: u32,
            opts: &MfccOptions,
        ) -> Result<FeatureMatrix> {
            self.calls.push(format!("mfcc@{}/{}", sample_rate, opts.sample_frequency));
            FeatureMatrix::from_rows(vec![vec![0.0; 13]; waveform.len() / 160])
        }

        fn apply(&mut self, stage: &FeatureStage, feats: FeatureMatrix) -> Result<FeatureMatrix> {
            self.calls.push(format!("{stage:?}"));
            Ok(feats)
        }
    }

    #[test]
    fn test_matrix_rows() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.num_cols(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.rows().count(), 2);

        assert_eq!(FeatureMatrix::default().rows().count(), 0);
        assert!(FeatureMatrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_mono_pipeline() {
        let pipeline = FeaturePipeline::for_family(ModelFamily::Mono, Path::new("exp/tri1"), 16000);
        let mut front_end = TraceFrontEnd::default();
        let feats = pipeline.run(&mut front_end, &[0.0; 1600], 16000).unwrap();

        assert_eq!(feats.num_rows(), 10);
        assert_eq!(
            front_end.calls,
            vec!["mfcc@16000/16000", "Cmvn", "Deltas { order: 2, window: 2 }"]
        );
    }

    #[test]
    fn test_transform_pipeline_uses_final_mat() {
        let pipeline =
            FeaturePipeline::for_family(ModelFamily::Transform, Path::new("exp/tri3a"), 16000);
        assert_eq!(pipeline.stages.len(), 3);
        assert_eq!(pipeline.stages[1], FeatureStage::Splice { left: 3, right: 3 });
        assert_eq!(
            pipeline.stages[2],
            FeatureStage::Transform(PathBuf::from("exp/tri3a/final.mat"))
        );
    }
}
