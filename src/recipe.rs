//! The Kaldi recipe scaffolding around the prepared data.
//!
//! `utils`, `steps` and `conf` are symlinked from the archive, the shell scripts are copied.

use std::fs;
use std::path::Path;

use glob::Pattern;
use tracing::{debug, info};

use crate::error::{PrepError, Result};

const LINKED_DIRS: [&str; 3] = ["utils", "steps", "conf"];

const PATH_SH: &str = r#"# Defining Kaldi root directory
export KALDI_ROOT=`pwd`/../..
# Setting paths to useful tools
export PATH=$PWD/utils/:$KALDI_ROOT/src/bin:$KALDI_ROOT/tools/openfst/bin:$KALDI_ROOT/src/fstbin/:$KALDI_ROOT/src/gmmbin/:$KALDI_ROOT/src/featbin/:$KALDI_ROOT/src/lmbin/:$KALDI_ROOT/src/sgmm2bin/:$KALDI_ROOT/src/fgmmbin/:$KALDI_ROOT/src/latbin/:$PWD:$PATH
# Defining audio data directory (modify it for your installation directory!)
export DATA_ROOT="{data_root}"
# Enable SRILM
. $KALDI_ROOT/tools/env.sh
# Variable needed for proper data sorting
export LC_ALL=C"#;

#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Links `src` at `dst` unless something is already there.
fn link_if_absent(src: &Path, dst: &Path) -> Result<()> {
    if dst.symlink_metadata().is_ok() {
        debug!("{} already exists, leaving it", dst.display());
        return Ok(());
    }
    symlink_dir(src, dst)?;
    Ok(())
}

/// Writes `path.sh`, pointing `DATA_ROOT` at `out_dir`.
pub fn write_path_sh(out_dir: &Path) -> Result<()> {
    let content = PATH_SH.replace("{data_root}", &out_dir.to_string_lossy());
    fs::write(out_dir.join("path.sh"), content)?;
    Ok(())
}

/// Sets up `out_dir` as a runnable recipe from the scripts in `archive_dir`.
///
/// `data/local` must already exist.
pub fn install_recipe(archive_dir: &Path, out_dir: &Path) -> Result<()> {
    if !archive_dir.is_dir() {
        return Err(PrepError::MissingDirectory(archive_dir.to_path_buf()));
    }
    let local_dir = out_dir.join("data").join("local");
    if !local_dir.is_dir() {
        return Err(PrepError::MissingDirectory(local_dir));
    }
    let archive_dir = std::path::absolute(archive_dir)?;

    for name in LINKED_DIRS {
        link_if_absent(&archive_dir.join(name), &out_dir.join(name))?;
    }
    fs::copy(archive_dir.join("score.sh"), local_dir.join("score.sh"))?;
    for name in ["prepare.sh", "cmd.sh"] {
        fs::copy(archive_dir.join(name), out_dir.join(name))?;
    }

    let pattern = format!("{}/run_*.sh", Pattern::escape(&archive_dir.to_string_lossy()));
    for path in glob::glob(&pattern)? {
        let path = path?;
        if let Some(name) = path.file_name() {
            fs::copy(&path, out_dir.join(name))?;
        }
    }

    write_path_sh(out_dir)?;
    info!("Installed recipe from {} into {}", archive_dir.display(), out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn archive(root: &Path) -> std::path::PathBuf {
        let archive = root.join("archive");
        for dir in LINKED_DIRS {
            fs::create_dir_all(archive.join(dir)).unwrap();
        }
        fs::write(archive.join("utils/validate.sh"), "#!/bin/bash\n").unwrap();
        for script in ["score.sh", "prepare.sh", "cmd.sh", "run_mono.sh", "run_tri1.sh"] {
            fs::write(archive.join(script), format!("# {script}\n")).unwrap();
        }
        archive
    }

    #[test]
    fn test_install_recipe() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive(temp_dir.path());
        let out_dir = temp_dir.path().join("egs/ist");
        fs::create_dir_all(out_dir.join("data/local")).unwrap();

        install_recipe(&archive, &out_dir).unwrap();

        assert!(out_dir.join("utils").symlink_metadata().unwrap().file_type().is_symlink());
        assert!(out_dir.join("utils/validate.sh").is_file());
        assert!(out_dir.join("data/local/score.sh").is_file());
        for script in ["prepare.sh", "cmd.sh", "run_mono.sh", "run_tri1.sh", "path.sh"] {
            assert!(out_dir.join(script).is_file(), "{script} missing");
        }

        let path_sh = fs::read_to_string(out_dir.join("path.sh")).unwrap();
        assert!(path_sh.contains(&format!("export DATA_ROOT=\"{}\"", out_dir.display())));
        assert!(path_sh.ends_with("export LC_ALL=C"));

        // Running again keeps the links and overwrites the copies.
        install_recipe(&archive, &out_dir).unwrap();
    }

    #[test]
    fn test_existing_dirs_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive(temp_dir.path());
        let out_dir = temp_dir.path().join("egs/ist");
        fs::create_dir_all(out_dir.join("data/local")).unwrap();
        fs::create_dir_all(out_dir.join("conf")).unwrap();

        install_recipe(&archive, &out_dir).unwrap();
        assert!(!out_dir.join("conf").symlink_metadata().unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_missing_local_dir_installs_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive(temp_dir.path());
        let out_dir = temp_dir.path().join("egs/ist");
        fs::create_dir_all(&out_dir).unwrap();

        let err = install_recipe(&archive, &out_dir).unwrap_err();
        assert!(matches!(err, PrepError::MissingDirectory(ref dir) if dir.ends_with("data/local")));
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_archive() {
        let temp_dir = TempDir::new().unwrap();
        let err = install_recipe(&temp_dir.path().join("nope"), temp_dir.path()).unwrap_err();
        assert!(matches!(err, PrepError::MissingDirectory(_)));
    }
}
