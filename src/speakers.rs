//! Splitting the speakers into train and test sets.

use std::collections::BTreeSet;
use std::fmt;

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::error::{PrepError, Result};

/// A corpus speaker, shown as `S` followed by the zero-padded id (`S07`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeakerId(pub u32);

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}", self.0)
    }
}

/// Speaker directory names look like `S` followed by digits.
pub fn is_speaker_name(name: &str) -> bool {
    name.strip_prefix('S')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<SpeakerId>,
    pub test: Vec<SpeakerId>,
}

/// Splits `all - excluded` into train and test.
///
/// The remaining ids are shuffled in ascending order with a generator seeded from `seed`,
/// then the first `floor(len * ratio)` of them go to train. The same inputs always give
/// the same split.
pub fn partition(
    all: &BTreeSet<u32>,
    excluded: &BTreeSet<u32>,
    ratio: f64,
    seed: u64,
) -> Result<Partition> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(PrepError::InvalidRatio(ratio));
    }

    let mut remaining: Vec<u32> = all.difference(excluded).copied().collect();
    let mut rng = StdRng::seed_from_u64(seed);
    remaining.shuffle(&mut rng);

    let split = (remaining.len() as f64 * ratio).floor() as usize;
    let test = remaining.split_off(split);

    Ok(Partition {
        train: remaining.into_iter().map(SpeakerId).collect(),
        test: test.into_iter().map(SpeakerId).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::RangeInclusive<u32>) -> BTreeSet<u32> {
        range.collect()
    }

    #[test]
    fn test_speaker_display() {
        assert_eq!(SpeakerId(3).to_string(), "S03");
        assert_eq!(SpeakerId(50).to_string(), "S50");
    }

    #[test]
    fn test_speaker_names() {
        assert!(is_speaker_name("S01"));
        assert!(is_speaker_name("S7x"));
        assert!(!is_speaker_name("S"));
        assert!(!is_speaker_name("spk2gender"));
        assert!(!is_speaker_name("Sx1"));
    }

    #[test]
    fn test_small_corpus_split() {
        let excluded = [5].into_iter().collect();
        let first = partition(&ids(1..=10), &excluded, 0.8, 0).unwrap();
        let second = partition(&ids(1..=10), &excluded, 0.8, 0).unwrap();

        assert_eq!(first.train.len(), 7);
        assert_eq!(first.test.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_split_covers_remaining_ids() {
        let excluded: BTreeSet<u32> = [11, 36, 44].into_iter().collect();
        for seed in 0..20 {
            let p = partition(&ids(1..=50), &excluded, 0.8, seed).unwrap();
            assert_eq!(p.train.len(), 37);

            let train: BTreeSet<u32> = p.train.iter().map(|s| s.0).collect();
            let test: BTreeSet<u32> = p.test.iter().map(|s| s.0).collect();
            assert!(train.is_disjoint(&test));

            let union: BTreeSet<u32> = train.union(&test).copied().collect();
            let expected: BTreeSet<u32> = ids(1..=50).difference(&excluded).copied().collect();
            assert_eq!(union, expected);
        }
    }

    #[test]
    fn test_ratio_bounds() {
        let none = BTreeSet::new();
        let all_train = partition(&ids(1..=4), &none, 1.0, 3).unwrap();
        assert_eq!(all_train.train.len(), 4);
        assert!(all_train.test.is_empty());

        let all_test = partition(&ids(1..=4), &none, 0.0, 3).unwrap();
        assert!(all_test.train.is_empty());
        assert_eq!(all_test.test.len(), 4);

        assert!(matches!(
            partition(&ids(1..=4), &none, 1.5, 0),
            Err(PrepError::InvalidRatio(_))
        ));
        assert!(partition(&ids(1..=4), &none, -0.1, 0).is_err());
        assert!(partition(&ids(1..=4), &none, f64::NAN, 0).is_err());
    }
}
