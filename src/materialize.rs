//! Copying the located recordings into the split directories.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::progress::progress_bar;
use crate::utterance::CorpusFile;

/// Copies each `filename` from `<source_root>/<speaker>/` to `<dest_root>/<speaker>/`.
///
/// Existing files are overwritten. A filename that is not `speaker.repetition.wordId.ext`
/// or a missing source file aborts the copy.
pub fn materialize(filenames: &[String], source_root: &Path, dest_root: &Path, label: &str) -> Result<()> {
    let pb = progress_bar(filenames.len(), label)?;

    for filename in filenames {
        let file = CorpusFile::parse(filename)?;
        let speaker_dir = dest_root.join(file.speaker);
        fs::create_dir_all(&speaker_dir)?;

        fs::copy(source_root.join(file.speaker).join(filename), speaker_dir.join(filename))?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Copied {} files into {}", filenames.len(), dest_root.display());
    Ok(())
}
