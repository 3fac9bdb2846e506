//! Process-backed coder
//!
//! Runs an external coding assistant once per message inside the
//! repository root and returns what it prints on stdout.

use anyhow::{anyhow, bail, Context};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use super::{ChunkStream, Coder};
use crate::logger;

pub struct CommandCoder {
    program: String,
    args: Vec<String>,
    repo_root: PathBuf,
    stream: bool,
    pretty: bool,
}

impl CommandCoder {
    /// The repository root must exist; it is stored in canonical form.
    pub fn new(program: &str, args: Vec<String>, repo_root: &Path) -> anyhow::Result<Self> {
        let repo_root = repo_root
            .canonicalize()
            .with_context(|| format!("repository root {} is not accessible", repo_root.display()))?;
        if !repo_root.is_dir() {
            bail!("repository root {} is not a directory", repo_root.display());
        }
        Ok(Self {
            program: program.to_string(),
            args,
            repo_root,
            stream: false,
            pretty: true,
        })
    }

    pub fn set_stream(&mut self, stream: bool) {
        self.stream = stream;
    }

    pub fn set_pretty(&mut self, pretty: bool) {
        self.pretty = pretty;
    }

    pub const fn stream(&self) -> bool {
        self.stream
    }

    pub const fn pretty(&self) -> bool {
        self.pretty
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self, message: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(if self.stream { "--stream" } else { "--no-stream" })
            .arg(if self.pretty { "--pretty" } else { "--no-pretty" })
            // One argv entry, so a message starting with `-` is not read as an option
            .arg(format!("--message={message}"))
            .current_dir(&self.repo_root)
            .stdin(Stdio::null());
        cmd
    }
}

impl Coder for CommandCoder {
    fn run(&self, message: &str) -> anyhow::Result<String> {
        let output = self
            .command(message)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to launch {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_stream(&self, message: &str) -> anyhow::Result<ChunkStream> {
        let mut child = self
            .command(message)
            .stdout(Stdio::piped())
            // Not captured: an unread pipe would stall the child
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to launch {}", self.program))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("{} has no stdout pipe", self.program))?;

        Ok(Box::new(OutputLines {
            program: self.program.clone(),
            child,
            reader: Some(BufReader::new(stdout)),
            reaped: false,
        }))
    }

    fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

/// Stdout of a running coder process, one line (terminator included) per chunk.
///
/// Dropping it before the end kills the process.
struct OutputLines {
    program: String,
    child: Child,
    reader: Option<BufReader<ChildStdout>>,
    reaped: bool,
}

impl OutputLines {
    fn finish(&mut self) -> Option<anyhow::Result<String>> {
        self.reaped = true;
        match self.child.wait() {
            Ok(status) if status.success() => None,
            Ok(status) => Some(Err(anyhow!("{} exited with {status}", self.program))),
            Err(e) => Some(Err(anyhow::Error::new(e).context(format!(
                "failed to wait for {}",
                self.program
            )))),
        }
    }
}

impl Iterator for OutputLines {
    type Item = anyhow::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.reader = None;
                self.finish()
            }
            // Lines never split a UTF-8 sequence, so per-line lossy decoding
            // matches decoding the whole output at once
            Ok(_) => Some(Ok(String::from_utf8_lossy(&line).into_owned())),
            Err(e) => {
                self.reader = None;
                Some(Err(anyhow::Error::new(e).context(format!(
                    "failed to read output of {}",
                    self.program
                ))))
            }
        }
    }
}

impl Drop for OutputLines {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            logger::log_warning(&format!("Failed to stop {}: {e}", self.program));
        }
        let _ = self.child.wait();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell_coder(script: &str, dir: &Path) -> CommandCoder {
        // `sh -c script name args...`: the coder flags land in "$@"
        let mut coder = CommandCoder::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "coder".to_string()],
            dir,
        )
        .unwrap();
        coder.set_stream(true);
        coder.set_pretty(false);
        coder
    }

    #[test]
    fn test_run_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder(r#"printf 'first\nsecond\n'"#, dir.path());
        assert_eq!(coder.run("hi").unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_flags_and_message_are_passed() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder(r#"echo "$@""#, dir.path());
        assert_eq!(
            coder.run("fix the bug").unwrap(),
            "--stream --no-pretty --message=fix the bug\n"
        );
    }

    #[test]
    fn test_dash_prefixed_message_stays_a_value() {
        let dir = tempfile::tempdir().unwrap();
        // Echo only the --message value, the way an option parser would see it
        let coder = shell_coder(
            r#"for a in "$@"; do case "$a" in --message=*) printf '%s' "${a#--message=}";; esac; done"#,
            dir.path(),
        );
        assert_eq!(coder.run("-v").unwrap(), "-v");
        assert_eq!(coder.run("--verbose please").unwrap(), "--verbose please");
    }

    #[test]
    fn test_runs_in_repo_root() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder("pwd", dir.path());
        let out = coder.run("where").unwrap();
        assert_eq!(Path::new(out.trim()), coder.repo_root());
    }

    #[test]
    fn test_run_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder("echo 'model unavailable' >&2; exit 3", dir.path());
        let err = coder.run("hi").unwrap_err().to_string();
        assert!(err.contains("model unavailable"), "{err}");
    }

    #[test]
    fn test_stream_matches_run() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder(r#"printf 'a\nbb\nccc'"#, dir.path());
        let chunks: Vec<String> = coder
            .run_stream("hi")
            .unwrap()
            .collect::<anyhow::Result<_>>()
            .unwrap();
        assert_eq!(chunks, vec!["a\n", "bb\n", "ccc"]);
        assert_eq!(chunks.concat(), coder.run("hi").unwrap());
    }

    #[test]
    fn test_stream_failure_after_output() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder("echo partial; exit 1", dir.path());
        let mut chunks = coder.run_stream("hi").unwrap();
        assert_eq!(chunks.next().unwrap().unwrap(), "partial\n");
        assert!(chunks.next().unwrap().is_err());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let coder = CommandCoder::new("coder-server-no-such-binary", Vec::new(), dir.path()).unwrap();
        assert!(coder.run("hi").is_err());
        assert!(coder.run_stream("hi").is_err());
    }

    #[test]
    fn test_dropping_stream_stops_process() {
        let dir = tempfile::tempdir().unwrap();
        let coder = shell_coder("while true; do echo tick; sleep 0.05; done", dir.path());
        let mut chunks = coder.run_stream("hi").unwrap();
        assert_eq!(chunks.next().unwrap().unwrap(), "tick\n");
        // Must return promptly instead of waiting for the endless loop
        drop(chunks);
    }
}
