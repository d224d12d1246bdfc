//! Scripted process backend for tests
//!
//! Replays canned output for commands whose arguments contain every
//! needle of a registered rule, and records every command it runs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::GitError;
use super::executor::{CommandSpec, OutputLine, ProcessBackend};

/// Canned result of one execution
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i32,
    /// Never exit after printing stdout
    pub hang: bool,
}

impl Response {
    pub fn ok(lines: &[&str]) -> Self {
        Self {
            stdout: lines.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn lines(lines: Vec<String>) -> Self {
        Self {
            stdout: lines,
            ..Default::default()
        }
    }

    pub fn fail(exit_code: i32, stderr: &str) -> Self {
        Self {
            stderr: vec![stderr.to_string()],
            exit_code,
            ..Default::default()
        }
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

struct Rule {
    needles: Vec<String>,
    /// The last response repeats once the queue is drained
    responses: VecDeque<Response>,
}

#[derive(Default)]
pub struct ScriptedBackend {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, needles: &[&str], response: Response) {
        self.respond_seq(needles, vec![response]);
    }

    pub fn respond_seq(&self, needles: &[&str], responses: Vec<Response>) {
        self.rules.lock().unwrap().push(Rule {
            needles: needles.iter().map(|s| s.to_string()).collect(),
            responses: responses.into(),
        });
    }

    /// Command arguments (without global options) of every run so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Runs whose arguments contain every needle
    pub fn calls_matching(&self, needles: &[&str]) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|args| needles.iter().all(|n| args.iter().any(|a| a == n)))
            .collect()
    }

    fn next_response(&self, args: &[String]) -> Option<Response> {
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|r| r.needles.iter().all(|n| args.iter().any(|a| a == n)))?;
        if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        }
    }
}

#[async_trait]
impl ProcessBackend for ScriptedBackend {
    async fn run(
        &self,
        spec: &CommandSpec,
        lines: UnboundedSender<OutputLine>,
    ) -> Result<i32, GitError> {
        let args = spec.command_args().to_vec();
        self.calls.lock().unwrap().push(args.clone());

        let Some(response) = self.next_response(&args) else {
            let _ = lines.send(OutputLine::Stderr(format!(
                "no scripted response for {args:?}"
            )));
            return Ok(1);
        };

        for line in response.stdout {
            let _ = lines.send(OutputLine::Stdout(line));
            tokio::task::yield_now().await;
        }
        for line in response.stderr {
            let _ = lines.send(OutputLine::Stderr(line));
        }
        if response.hang {
            std::future::pending::<()>().await;
        }
        Ok(response.exit_code)
    }
}
