//! External process plumbing for the system `ffmpeg` and `ffprobe` binaries.
//!
//! We intentionally shell out to the system binaries rather than link against
//! native FFmpeg bindings, to avoid dev header/lib requirements. Every
//! invocation is blocking; callers that need timeouts must impose them around
//! the call.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{StoryReelError, StoryReelResult};

pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A quiet, overwrite-by-default `ffmpeg` invocation. Callers append inputs,
/// codec flags and the output path.
pub(crate) fn ffmpeg_cmd() -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-y"]);
    cmd
}

/// Run a fully assembled command, folding a non-zero exit status and its
/// stderr into a `Process` error. `what` names the operation for diagnostics.
pub(crate) fn run_tool(mut cmd: Command, what: &str) -> StoryReelResult<()> {
    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StoryReelError::process(format!("failed to run {what}: {e}")))?;
    if !out.status.success() {
        return Err(StoryReelError::process(format!(
            "{what} exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

/// Like [`run_tool`] but returns captured stdout (used for ffprobe JSON).
pub(crate) fn run_tool_capture(mut cmd: Command, what: &str) -> StoryReelResult<Vec<u8>> {
    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StoryReelError::process(format!("failed to run {what}: {e}")))?;
    if !out.status.success() {
        return Err(StoryReelError::process(format!(
            "{what} exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}

/// Run a caller-supplied assembly script with `workdir` as its working
/// directory. The script's contract (expected inputs and output artifact) is
/// enforced by the caller, not here.
pub(crate) fn run_assembly_script(script: &str, workdir: &Path) -> StoryReelResult<()> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script).current_dir(workdir);
    run_tool(cmd, "assembly script")
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StoryReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Move `from` to `to`, replacing any existing file. Falls back to
/// copy-then-remove when the rename crosses filesystems (scratch workspaces
/// usually live on the system temp mount).
pub(crate) fn replace_file(from: &Path, to: &Path) -> StoryReelResult<()> {
    use anyhow::Context as _;
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("failed to move '{}' to '{}'", from.display(), to.display()))?;
    std::fs::remove_file(from)
        .with_context(|| format!("failed to remove staged file '{}'", from.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_tool_reports_nonzero_exit_with_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo nope >&2; exit 3"]);
        let err = run_tool(cmd, "probe").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("probe exited with status"), "{msg}");
        assert!(msg.contains("nope"), "{msg}");
    }

    #[test]
    fn run_tool_capture_returns_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf hello"]);
        let out = run_tool_capture(cmd, "probe").unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn replace_file_overwrites_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("staged.bin");
        let to = dir.path().join("final.bin");
        std::fs::write(&from, b"new").unwrap();
        std::fs::write(&to, b"old").unwrap();
        replace_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"new");
    }
}
