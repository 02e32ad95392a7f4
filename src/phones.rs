//! Phone tokens and the phone-set files of the dict directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{PrepError, Result};

pub const NONSILENCE_PHONES_FILE: &str = "nonsilence_phones.txt";
pub const SILENCE_PHONES_FILE: &str = "silence_phones.txt";
pub const OPTIONAL_SILENCE_FILE: &str = "optional_silence.txt";

// The phonemizer pads its streams with this.
const SEPARATOR: char = '_';

/// Splits a phonemizer stream into phones.
///
/// A digit marks stress on the letter before it and is kept in the same token, so
/// `"b1a2"` is `["b1", "a2"]` and `"sil"` is `["s", "i", "l"]`. A digit with no letter
/// before it never becomes a token on its own.
pub fn tokenize(stream: &str) -> Vec<String> {
    let chars: Vec<char> = stream.trim().trim_matches(SEPARATOR).chars().collect();
    let Some((&last, _)) = chars.split_last() else {
        return Vec::new();
    };

    let mut tokens = Vec::with_capacity(chars.len());
    for pair in chars.windows(2) {
        let (c, next) = (pair[0], pair[1]);
        if c.is_ascii_digit() {
            continue;
        }
        if next.is_ascii_digit() {
            tokens.push(format!("{c}{next}"));
        } else {
            tokens.push(c.to_string());
        }
    }
    if !last.is_ascii_digit() {
        tokens.push(last.to_string());
    }
    tokens
}

fn write_phones(path: &Path, phones: &[String]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for phone in phones {
        writeln!(out, "{phone}")?;
    }
    out.flush()?;
    Ok(())
}

/// Writes `nonsilence_phones.txt`, `silence_phones.txt` and `optional_silence.txt`.
pub fn write_phone_sets(
    dict_dir: &Path,
    nonsilence: &[String],
    silence: &[String],
    optional: &[String],
) -> Result<()> {
    if silence.is_empty() {
        return Err(PrepError::EmptyPhoneList(SILENCE_PHONES_FILE));
    }
    if optional.is_empty() {
        return Err(PrepError::EmptyPhoneList(OPTIONAL_SILENCE_FILE));
    }
    write_phones(&dict_dir.join(NONSILENCE_PHONES_FILE), nonsilence)?;
    write_phones(&dict_dir.join(SILENCE_PHONES_FILE), silence)?;
    write_phones(&dict_dir.join(OPTIONAL_SILENCE_FILE), optional)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_merges_stress_digits() {
        assert_eq!(tokenize("b1a2"), vec!["b1", "a2"]);
        assert_eq!(tokenize("sil"), vec!["s", "i", "l"]);
        assert_eq!(tokenize("wa2Hid"), vec!["w", "a2", "H", "i", "d"]);
    }

    #[test]
    fn test_tokenize_strips_padding() {
        assert_eq!(tokenize("  _$i2fr_\n"), vec!["$", "i2", "f", "r"]);
        assert_eq!(tokenize("_¥a€_"), vec!["¥", "a", "€"]);
    }

    #[test]
    fn test_tokenize_never_emits_lone_digits() {
        assert_eq!(tokenize("a12"), vec!["a1"]);
        assert_eq!(tokenize("1a"), vec!["a"]);
        assert_eq!(tokenize("7"), Vec::<String>::new());
        assert!(tokenize("").is_empty());
        assert!(tokenize("__").is_empty());
    }

    #[test]
    fn test_write_phone_sets() {
        let temp_dir = TempDir::new().unwrap();
        write_phone_sets(
            temp_dir.path(),
            &strings(&["a", "a2", "b"]),
            &strings(&["sil", "spn"]),
            &strings(&["sil"]),
        )
        .unwrap();

        let read = |name| fs::read_to_string(temp_dir.path().join(name)).unwrap();
        assert_eq!(read(NONSILENCE_PHONES_FILE), "a\na2\nb\n");
        assert_eq!(read(SILENCE_PHONES_FILE), "sil\nspn\n");
        assert_eq!(read(OPTIONAL_SILENCE_FILE), "sil\n");
    }

    #[test]
    fn test_empty_silence_lists_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = write_phone_sets(temp_dir.path(), &[], &[], &strings(&["sil"])).unwrap_err();
        assert!(matches!(err, PrepError::EmptyPhoneList(SILENCE_PHONES_FILE)));

        let err = write_phone_sets(temp_dir.path(), &[], &strings(&["sil"]), &[]).unwrap_err();
        assert!(matches!(err, PrepError::EmptyPhoneList(OPTIONAL_SILENCE_FILE)));
    }
}
