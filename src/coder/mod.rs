//! Coder abstraction
//!
//! The HTTP layer only talks to a [`Coder`]: something that turns a message
//! into text, either all at once or as a sequence of chunks, and that knows
//! the repository it works on.

mod command;

pub use command::CommandCoder;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::CoderConfig;

/// Chunks produced by [`Coder::run_stream`], in order. Each step may block.
pub type ChunkStream = Box<dyn Iterator<Item = anyhow::Result<String>> + Send>;

/// Capability interface of the coding assistant.
///
/// Calls are synchronous and may block for a long time; callers on an async
/// runtime must move them to a blocking thread.
pub trait Coder: Send + Sync {
    /// Process `message` and return the complete reply.
    fn run(&self, message: &str) -> anyhow::Result<String>;

    /// Process `message` and return the reply as a lazy chunk sequence.
    fn run_stream(&self, message: &str) -> anyhow::Result<ChunkStream>;

    /// Root directory of the repository the coder works on.
    fn repo_root(&self) -> &Path;
}

/// Build the process-backed coder from configuration plus extra argv, with
/// output forced to plain streamed text.
pub fn build_coder(config: &CoderConfig, extra_args: &[String]) -> anyhow::Result<CommandCoder> {
    let repo_root = match config.repo.as_deref() {
        Some(repo) => PathBuf::from(repo),
        None => {
            let cwd = std::env::current_dir()?;
            detect_repo_root(&cwd).unwrap_or(cwd)
        }
    };

    let mut args = config.args.clone();
    args.extend_from_slice(extra_args);

    let mut coder = CommandCoder::new(&config.command, args, &repo_root)?;
    // Replies must come back as text, not as a rendered terminal UI
    coder.set_stream(true);
    coder.set_pretty(false);
    Ok(coder)
}

/// Detect the Git repository top-level containing `dir`.
/// Returns `None` outside a repository or when git is unavailable.
pub fn detect_repo_root(dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("rev-parse")
        .arg("--show-toplevel")
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if s.is_empty() {
        return None;
    }
    let p = PathBuf::from(s);
    std::fs::canonicalize(&p).ok().or(Some(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_coder_forces_text_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoderConfig {
            command: "aider".to_string(),
            args: vec!["--yes-always".to_string()],
            repo: Some(dir.path().to_string_lossy().into_owned()),
            serialize_requests: false,
            stream_buffer: 16,
        };
        let coder = build_coder(&config, &["--model".to_string(), "x".to_string()]).unwrap();
        assert!(coder.stream());
        assert!(!coder.pretty());
        assert_eq!(coder.args(), ["--yes-always", "--model", "x"]);
        assert_eq!(coder.repo_root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_build_coder_rejects_missing_repo() {
        let config = CoderConfig {
            command: "aider".to_string(),
            args: Vec::new(),
            repo: Some("/nonexistent/coder-server/repo".to_string()),
            serialize_requests: false,
            stream_buffer: 16,
        };
        assert!(build_coder(&config, &[]).is_err());
    }

    #[test]
    fn test_detect_repo_root_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        // A fresh temp dir is not inside a repository (unless TMPDIR is)
        if let Some(root) = detect_repo_root(dir.path()) {
            assert!(dir.path().canonicalize().unwrap().starts_with(root));
        }
    }
}
