//! Oracle backed by an external program.
//!
//! Each call spawns the configured program, writes one JSON request to its
//! stdin and reads one JSON reply from its stdout:
//!
//! ```text
//! -> {"kind":"legality","program":"blur","schedule":["P(L0)"],"computations":[]}
//! <- {"legal": true}
//! -> {"kind":"skewing","program":"blur","schedule":[],"loop_levels":[0,1],"computations":["comp00"]}
//! <- {"factors": [1, 1]}
//! ```
//!
//! Anything other than a clean exit with a parsable reply inside the
//! timeout is reported as `OracleUnavailable`. Nothing is retried.

use crate::oracle::LegalityOracle;
use crate::program::Program;
use crate::transform::TransformationAction;
use crate::utils::errors::{ScheduleError, SchedResult};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// How to reach the oracle program.
#[derive(Clone, Debug)]
pub struct CommandOracleConfig {
    /// Executable to run
    pub program: PathBuf,

    /// Extra arguments passed on every call
    pub args: Vec<String>,

    /// Upper bound on one call, from spawn to closed output, after which
    /// the child is killed
    pub timeout: Duration,
}

impl CommandOracleConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for CommandOracleConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("legality-oracle"),
            args: vec![],
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize, Debug)]
struct OracleRequest<'a> {
    kind: &'static str,
    program: &'a str,
    schedule: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loop_levels: Option<[usize; 2]>,
    computations: &'a [String],
}

/// Completion of one pipe of the child, reported by its helper thread.
enum PipeEvent {
    Written(io::Result<()>),
    Stdout(io::Result<String>),
    Stderr(io::Result<String>),
}

fn drain<R: Read + Send + 'static>(
    mut pipe: R,
    events: Sender<PipeEvent>,
    wrap: fn(io::Result<String>) -> PipeEvent,
) {
    thread::spawn(move || {
        let mut out = String::new();
        let result = pipe.read_to_string(&mut out).map(|_| out);
        let _ = events.send(wrap(result));
    });
}

fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[derive(Deserialize, Debug)]
struct LegalityReply {
    legal: bool,
}

#[derive(Deserialize, Debug)]
struct SkewingReply {
    factors: Option<(i64, i64)>,
}

/// Oracle that shells out to an external program per call.
pub struct CommandOracle {
    config: CommandOracleConfig,
}

impl CommandOracle {
    pub fn new(config: CommandOracleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CommandOracleConfig {
        &self.config
    }

    fn request<'a>(
        kind: &'static str,
        program: &'a Program,
        schedule: &[TransformationAction],
        loop_levels: Option<[usize; 2]>,
        computations: &'a [String],
    ) -> SchedResult<OracleRequest<'a>> {
        let schedule = schedule
            .iter()
            .map(|a| a.short_form(&program.tree))
            .collect::<SchedResult<Vec<_>>>()?;
        Ok(OracleRequest {
            kind,
            program: &program.name,
            schedule,
            loop_levels,
            computations,
        })
    }

    /// Run the oracle once and parse its reply.
    ///
    /// Stdin, stdout and stderr are each serviced by their own thread, so
    /// the child never blocks on a full pipe and the deadline covers the
    /// whole exchange.
    fn call<T: DeserializeOwned>(&self, request: &OracleRequest<'_>) -> SchedResult<T> {
        let unavailable = |what: String| ScheduleError::OracleUnavailable(what);
        let payload = serde_json::to_vec(request)?;
        debug!("oracle request: {}", String::from_utf8_lossy(&payload));

        let deadline = Instant::now() + self.config.timeout;
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to start {:?}: {}", self.config.program, e)))?;

        let (events, received) = mpsc::channel();
        if let Some(mut stdin) = child.stdin.take() {
            let events = events.clone();
            thread::spawn(move || {
                let _ = events.send(PipeEvent::Written(stdin.write_all(&payload)));
            });
        }
        if let Some(stdout) = child.stdout.take() {
            drain(stdout, events.clone(), PipeEvent::Stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            drain(stderr, events.clone(), PipeEvent::Stderr);
        }
        drop(events);

        let mut stdout = None;
        let mut stderr = None;
        while stdout.is_none() || stderr.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match received.recv_timeout(remaining) {
                // An oracle may answer without reading the whole request.
                Ok(PipeEvent::Written(Err(e))) if e.kind() != io::ErrorKind::BrokenPipe => {
                    abandon(&mut child);
                    return Err(unavailable(format!("failed to send request: {}", e)));
                }
                Ok(PipeEvent::Written(_)) => {}
                Ok(PipeEvent::Stdout(Ok(out))) => stdout = Some(out),
                Ok(PipeEvent::Stdout(Err(e))) => {
                    abandon(&mut child);
                    return Err(unavailable(format!("failed to read reply: {}", e)));
                }
                Ok(PipeEvent::Stderr(err)) => stderr = Some(err.unwrap_or_default()),
                Err(RecvTimeoutError::Timeout) => {
                    abandon(&mut child);
                    warn!("oracle timed out after {:?}", self.config.timeout);
                    return Err(unavailable(format!("timed out after {:?}", self.config.timeout)));
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Both output pipes are closed at this point, so the child is done.
        let status = child
            .wait()
            .map_err(|e| unavailable(format!("failed to wait for oracle: {}", e)))?;
        let stderr = stderr.unwrap_or_default();
        if !status.success() {
            return Err(unavailable(format!("oracle exited with {}: {}", status, stderr.trim())));
        }
        if !stderr.is_empty() {
            debug!("oracle wrote {} bytes to stderr", stderr.len());
        }

        let stdout = stdout.unwrap_or_default();
        debug!("oracle reply: {}", stdout.trim());
        serde_json::from_str(stdout.trim()).map_err(|e| unavailable(format!("unparsable reply: {}", e)))
    }
}

impl LegalityOracle for CommandOracle {
    fn is_legal(&self, program: &Program, schedule: &[TransformationAction]) -> SchedResult<bool> {
        let request = Self::request("legality", program, schedule, None, &[])?;
        let reply: LegalityReply = self.call(&request)?;
        Ok(reply.legal)
    }

    fn solve_skewing(
        &self,
        program: &Program,
        schedule: &[TransformationAction],
        loop_levels: (usize, usize),
        computations: &[String],
    ) -> SchedResult<Option<(i64, i64)>> {
        let request = Self::request(
            "skewing",
            program,
            schedule,
            Some([loop_levels.0, loop_levels.1]),
            computations,
        )?;
        let reply: SkewingReply = self.call(&request)?;
        Ok(reply.factors)
    }

    fn name(&self) -> &str {
        "command"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tree::iterator_tree::tests::sample_annotation;

    fn shell(script: &str) -> CommandOracle {
        CommandOracle::new(
            CommandOracleConfig::new("/bin/sh")
                .args(vec!["-c".to_string(), script.to_string()])
                .timeout(Duration::from_secs(5)),
        )
    }

    fn program() -> Program {
        Program::new("sample", sample_annotation()).unwrap()
    }

    #[test]
    fn test_legal_reply() {
        let oracle = shell("cat > /dev/null; echo '{\"legal\": true}'");
        assert!(oracle.is_legal(&program(), &[]).unwrap());
    }

    #[test]
    fn test_skewing_reply() {
        let oracle = shell("cat > /dev/null; echo '{\"factors\": [1, 2]}'");
        let factors = oracle
            .solve_skewing(&program(), &[], (1, 2), &["comp03".to_string()])
            .unwrap();
        assert_eq!(factors, Some((1, 2)));

        let oracle = shell("cat > /dev/null; echo '{\"factors\": null}'");
        assert_eq!(oracle.solve_skewing(&program(), &[], (1, 2), &[]).unwrap(), None);
    }

    #[test]
    fn test_request_carries_rendered_schedule() {
        let oracle = shell("grep -q 'P(L0)' && echo '{\"legal\": true}' || echo '{\"legal\": false}'");
        let action = TransformationAction::parallelization(
            crate::tree::IteratorId::new("root"),
            vec!["comp01".to_string()],
        )
        .unwrap();
        assert!(oracle.is_legal(&program(), &[action]).unwrap());
        assert!(!oracle.is_legal(&program(), &[]).unwrap());
    }

    #[test]
    fn test_failures_are_unavailable() {
        let garbage = shell("cat > /dev/null; echo nope");
        assert!(matches!(
            garbage.is_legal(&program(), &[]),
            Err(ScheduleError::OracleUnavailable(_))
        ));

        let crashing = shell("cat > /dev/null; exit 3");
        assert!(matches!(
            crashing.is_legal(&program(), &[]),
            Err(ScheduleError::OracleUnavailable(_))
        ));

        let missing = CommandOracle::new(CommandOracleConfig::new("/nonexistent/oracle"));
        assert!(matches!(
            missing.is_legal(&program(), &[]),
            Err(ScheduleError::OracleUnavailable(_))
        ));
    }

    #[test]
    fn test_chatty_stderr_does_not_stall() {
        // Far more than a pipe buffer on stderr before the reply.
        let oracle = shell("cat > /dev/null; yes log | head -c 200000 >&2; echo '{\"legal\": true}'");
        assert!(oracle.is_legal(&program(), &[]).unwrap());
    }

    #[test]
    fn test_failure_reports_stderr() {
        let oracle = shell("cat > /dev/null; echo 'no solver license' >&2; exit 2");
        let err = oracle.is_legal(&program(), &[]).unwrap_err();
        assert!(err.to_string().contains("no solver license"));
    }

    #[test]
    fn test_oracle_ignoring_stdin_may_still_answer() {
        let oracle = shell("echo '{\"legal\": false}'");
        assert!(!oracle.is_legal(&program(), &[]).unwrap());
    }

    #[test]
    fn test_timeout_kills_child() {
        let oracle = CommandOracle::new(
            CommandOracleConfig::new("/bin/sh")
                .args(vec!["-c".to_string(), "sleep 5".to_string()])
                .timeout(Duration::from_millis(100)),
        );
        let start = Instant::now();
        let err = oracle.is_legal(&program(), &[]).unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
