//! Finding the corpus recordings for a set of speakers and words.

use std::path::Path;

use glob::Pattern;
use tracing::debug;

use crate::error::Result;
use crate::speakers::SpeakerId;

/// Collects the filenames of every recording of `word_ids` by `speakers`.
///
/// Recordings live at `<source_root>/<speaker>/<speaker>.<repetition>.<wordId:02>.wav`; every
/// repetition matches. Only basenames are returned, in speaker then word order.
pub fn locate(speakers: &[SpeakerId], word_ids: &[u32], source_root: &Path) -> Result<Vec<String>> {
    let root = Pattern::escape(&source_root.to_string_lossy());
    let mut files = Vec::new();

    for speaker in speakers {
        for word_id in word_ids {
            let pattern = format!("{root}/{speaker}/{speaker}.*.{word_id:02}.wav");
            let paths: Vec<_> = glob::glob(&pattern)?.collect::<std::result::Result<_, _>>()?;
            debug!("{} matches for {}", paths.len(), pattern);

            files.extend(
                paths
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|name| name.to_string_lossy().into_owned()),
            );
        }
    }

    Ok(files)
}
