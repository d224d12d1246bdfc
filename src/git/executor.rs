//! git command executor
//!
//! Handles spawning git processes and streaming their output line by line.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

use super::GitError;
use super::constants::{self, flags};

/// Everything needed to spawn (and respawn) one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// A git invocation in `cwd` with the global parse-safety options prepended
    pub fn git<I, S>(program: &str, cwd: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all: Vec<String> = flags::GLOBAL.iter().map(|s| s.to_string()).collect();
        all.extend(args.into_iter().map(Into::into));
        Self {
            program: program.to_string(),
            args: all,
            cwd: cwd.into(),
            // Never block on a credential prompt
            env: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
        }
    }

    /// Arguments after the global options
    pub fn command_args(&self) -> &[String] {
        let skip = if self.args.starts_with(&global_args()) {
            flags::GLOBAL.len()
        } else {
            0
        };
        &self.args[skip..]
    }

    /// Human readable command line for logs and errors
    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.command_args().join(" "))
    }
}

fn global_args() -> Vec<String> {
    flags::GLOBAL.iter().map(|s| s.to_string()).collect()
}

/// One line of process output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Capability to run a command to completion
///
/// Implementations forward every output line through `lines` as soon as
/// it is read and return the exit code. Dropping the returned future must
/// terminate the process.
#[async_trait]
pub trait ProcessBackend: Send + Sync + 'static {
    async fn run(&self, spec: &CommandSpec, lines: UnboundedSender<OutputLine>)
    -> Result<i32, GitError>;
}

/// Backend that spawns real processes through tokio
#[derive(Debug, Clone, Default)]
pub struct GitExecutor;

impl GitExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessBackend for GitExecutor {
    async fn run(
        &self,
        spec: &CommandSpec,
        lines: UnboundedSender<OutputLine>,
    ) -> Result<i32, GitError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && spec.program == constants::GIT_COMMAND {
                GitError::GitNotFound
            } else {
                GitError::IoError(e)
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let out_lines = lines.clone();
        let (out, err) = tokio::join!(
            forward_lines(stdout, out_lines, OutputLine::Stdout),
            forward_lines(stderr, lines, OutputLine::Stderr),
        );
        out?;
        err?;

        let status = child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// Read `reader` line by line, wrapping each line with `wrap`
///
/// Bytes that are not UTF-8 (paths or messages in a legacy encoding) are
/// replaced rather than failing the whole command.
async fn forward_lines<R>(
    reader: Option<R>,
    lines: UnboundedSender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) -> Result<(), GitError>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(());
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        // Receiver gone means nobody is listening any more; keep draining
        let _ = lines.send(wrap(decode_line(&buf)));
    }
}

/// Lossy UTF-8 decoding of one raw line without its terminator
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
