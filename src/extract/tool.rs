//! External command-line tools (ffmpeg, pdftoppm, tesseract)

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Run `bin` with `args`, failing with `Error::Extraction` on a missing
/// binary or a non-zero exit
pub async fn run<I, S>(bin: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    capture(bin, args).await.map(|_| ())
}

/// Like `run`, returning the tool's stdout
pub async fn capture<I, S>(bin: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(bin);
    command.args(args).kill_on_drop(true);
    debug!("Running {:?}", command.as_std());

    let output = command.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Extraction(format!("{} not found; install it or configure its path", bin))
        } else {
            Error::Extraction(format!("Failed to run {}: {}", bin, e))
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(5)..].join("\n");
        return Err(Error::Extraction(format!(
            "{} exited with {}: {}",
            bin, output.status, tail
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Files in `dir` named `{prefix}<number>.{ext}`, sorted by number
pub fn numbered_files(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<(u32, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let number = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(ext))
            .and_then(|rest| rest.strip_suffix('.'))
            .and_then(|digits| digits.parse::<u32>().ok());
        if let Some(number) = number {
            files.push((number, path));
        }
    }
    files.sort_by_key(|(n, _)| *n);
    Ok(files)
}
