//! Progress bars shared by the long-running loops.

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;

/// A bar in the style of `[elapsed] [####>---] pos/len (eta)`, prefixed with `label`.
pub fn progress_bar(len: usize, label: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:15.bold.dim} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_prefix(label.to_string());
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        let pb = progress_bar(3, "train").unwrap();
        assert_eq!(pb.length(), Some(3));
        assert_eq!(pb.prefix(), "train");
    }
}
