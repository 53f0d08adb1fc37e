//! Output file handling.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Path of the output file for `namespace` inside `dir`.
pub fn output_path(dir: impl AsRef<Path>, namespace: &str) -> PathBuf {
    dir.as_ref().join(format!("{namespace}.yaml"))
}

/// Ask whether an existing file may be overwritten.
///
/// Only an answer starting with `y` or `Y` counts as yes; anything else,
/// including end of input, is no.
pub fn confirm_overwrite<R: BufRead, W: Write>(
    path: &Path,
    mut input: R,
    mut prompt: W,
) -> io::Result<bool> {
    write!(prompt, "{} already exists. Overwrite? [y/N] ", path.display())?;
    prompt.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_start().starts_with(['y', 'Y']))
}

/// Write the rendered documents.
pub fn write_output(path: &Path, rendered: &str) -> io::Result<()> {
    std::fs::write(path, rendered)?;
    tracing::info!(path = %path.display(), "wrote policies");
    Ok(())
}
