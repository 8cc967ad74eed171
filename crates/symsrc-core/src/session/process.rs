//! Debugger session over a child process's standard streams.
//!
//! Two reader threads forward raw stdout and stderr chunks over one channel.
//! Replies are assembled from those chunks until the last non-empty line
//! starts with the prompt. Prompts are not newline-terminated, so reading is
//! byte-oriented rather than line-oriented.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::{capture_script_environment, CommandSet, DebuggerSession, ReplyStatus, SessionFactory, SessionReply};
use crate::config::DebuggerConfig;
use crate::error::{LocatorError, LocatorResult};

const READ_CHUNK: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A running debugger process.
///
/// Dropping the session closes it.
pub struct ProcessSession
{
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    output: Receiver<Vec<u8>>,
    commands: CommandSet,
    executable: String,
    grace: Duration,
}

impl ProcessSession
{
    /// Spawn the configured debugger and bring it to its first prompt.
    ///
    /// The primary executable is tried first; any spawn failure falls back to
    /// `fallback_executable`. Once running, the init commands are sent and
    /// every existing search path is registered.
    ///
    /// ## Errors
    ///
    /// Returns `ProcessStart` if neither executable can be spawned, or if the
    /// banner or a setup command does not reach the prompt in time. A late
    /// prompt would be taken as the end of the next reply, so such a session
    /// is closed instead of used.
    pub fn start(config: &DebuggerConfig, environment: &BTreeMap<String, String>) -> LocatorResult<Self>
    {
        let (child, executable) = spawn_debugger(config, environment)?;
        let mut session = Self::attach(child, executable, config.commands.clone(), config.close_grace())?;
        let timeout = config.command_timeout();

        let banner = session.read_reply(timeout);
        match banner.status {
            ReplyStatus::Prompt => trace!(banner = %banner.text, "debugger ready"),
            ReplyStatus::TimedOut => {
                return Err(start_error(
                    config,
                    format!("no prompt from `{}` within {timeout:?}", session.executable),
                ));
            }
            ReplyStatus::Closed => {
                return Err(start_error(
                    config,
                    format!("`{}` exited before its first prompt: {}", session.executable, banner.text),
                ));
            }
        }

        for command in &config.commands.init {
            session.setup(config, command)?;
        }

        for path in &config.search_paths {
            if !path.exists() {
                warn!(path = %path.display(), "skipping missing search path");
                continue;
            }
            let command = session.commands.search_path(&path.display().to_string());
            session.setup(config, &command)?;
        }

        info!(executable = %session.executable, pid = session.pid(), "debugger session started");
        Ok(session)
    }

    fn setup(&mut self, config: &DebuggerConfig, command: &str) -> LocatorResult<()>
    {
        let reply = self.send(command, config.command_timeout());
        if reply.is_complete() {
            return Ok(());
        }
        warn!(command, status = ?reply.status, "setup command got no prompt, abandoning session");
        Err(start_error(
            config,
            format!("`{}` gave no prompt after `{command}` ({:?})", self.executable, reply.status),
        ))
    }

    fn attach(mut child: Child, executable: String, commands: CommandSet, grace: Duration) -> LocatorResult<Self>
    {
        let (sender, output) = mpsc::channel();
        let stdin = child.stdin.take().ok_or_else(|| io::Error::other("debugger stdin not piped"))?;
        let stdout = child.stdout.take().ok_or_else(|| io::Error::other("debugger stdout not piped"))?;
        let stderr = child.stderr.take().ok_or_else(|| io::Error::other("debugger stderr not piped"))?;

        let session = Self {
            child: Some(child),
            stdin: Some(stdin),
            output,
            commands,
            executable,
            grace,
        };
        spawn_pipe_reader(stdout, "stdout", sender.clone())?;
        spawn_pipe_reader(stderr, "stderr", sender)?;
        Ok(session)
    }

    /// Executable that actually started, primary or fallback.
    #[must_use]
    pub fn executable(&self) -> &str
    {
        &self.executable
    }

    /// OS process id, while the process is owned.
    #[must_use]
    pub fn pid(&self) -> Option<u32>
    {
        self.child.as_ref().map(Child::id)
    }

    fn drain_pending(&self) -> usize
    {
        self.output.try_iter().map(|chunk| chunk.len()).sum()
    }

    fn read_reply(&self, timeout: Duration) -> SessionReply
    {
        let deadline = Instant::now() + timeout;
        let mut buffer = Vec::new();
        loop {
            if let Some(cut) = prompt_offset(&buffer, &self.commands.prompt) {
                return SessionReply::complete(decode(&buffer[..cut]));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return SessionReply::timed_out(decode(&buffer));
            }

            match self.output.recv_timeout(remaining) {
                Ok(chunk) => buffer.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => return SessionReply::timed_out(decode(&buffer)),
                Err(RecvTimeoutError::Disconnected) => {
                    return SessionReply {
                        text: decode(&buffer),
                        status: ReplyStatus::Closed,
                    };
                }
            }
        }
    }
}

impl DebuggerSession for ProcessSession
{
    fn commands(&self) -> &CommandSet
    {
        &self.commands
    }

    fn send(&mut self, command: &str, timeout: Duration) -> SessionReply
    {
        let stale = self.drain_pending();
        if stale > 0 {
            trace!(bytes = stale, "discarded stale debugger output");
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return SessionReply::closed();
        };

        trace!(command, "debugger command");
        if let Err(err) = writeln!(stdin, "{command}").and_then(|()| stdin.flush()) {
            warn!(%err, command, "debugger input closed");
            self.stdin = None;
            return SessionReply::closed();
        }

        let reply = self.read_reply(timeout);
        match reply.status {
            ReplyStatus::Prompt => {}
            ReplyStatus::TimedOut => debug!(command, ?timeout, "debugger reply timed out"),
            ReplyStatus::Closed => {
                warn!(command, "debugger exited mid-reply");
                self.stdin = None;
            }
        }
        reply
    }

    fn close(&mut self)
    {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Some(mut stdin) = self.stdin.take() {
            if !self.commands.quit.is_empty() {
                let _ = writeln!(stdin, "{}", self.commands.quit).and_then(|()| stdin.flush());
            }
        }

        let first_wait = self.grace / 2;
        if wait_for_exit(&mut child, first_wait) {
            debug!(executable = %self.executable, "debugger quit");
            return;
        }

        terminate(&child);
        if wait_for_exit(&mut child, self.grace.saturating_sub(first_wait)) {
            debug!(executable = %self.executable, "debugger terminated");
            return;
        }

        warn!(executable = %self.executable, pid = child.id(), "debugger ignored quit and SIGTERM, killing");
        if let Err(err) = child.kill() {
            debug!(%err, "kill failed");
        }
        let _ = child.wait();
    }

    fn is_closed(&self) -> bool
    {
        self.child.is_none() || self.stdin.is_none()
    }
}

impl Drop for ProcessSession
{
    fn drop(&mut self)
    {
        self.close();
    }
}

/// Starts [`ProcessSession`]s from one configuration.
///
/// The environment script, if any, is sourced once here and reused for every
/// session.
pub struct ProcessSessionFactory
{
    config: DebuggerConfig,
    environment: BTreeMap<String, String>,
}

impl ProcessSessionFactory
{
    #[must_use]
    pub fn new(config: DebuggerConfig) -> Self
    {
        let mut environment = BTreeMap::new();
        if let Some(script) = &config.environment_script {
            match capture_script_environment(script) {
                Ok(vars) => environment.extend(vars),
                Err(err) => warn!(%err, "continuing without script environment"),
            }
        }
        environment.extend(config.environment.clone());
        Self { config, environment }
    }

    #[must_use]
    pub fn config(&self) -> &DebuggerConfig
    {
        &self.config
    }

    /// Environment passed to each debugger on top of the inherited one.
    #[must_use]
    pub fn environment(&self) -> &BTreeMap<String, String>
    {
        &self.environment
    }
}

impl SessionFactory for ProcessSessionFactory
{
    fn start(&self) -> LocatorResult<Box<dyn DebuggerSession>>
    {
        Ok(Box::new(ProcessSession::start(&self.config, &self.environment)?))
    }
}

fn spawn_debugger(config: &DebuggerConfig, environment: &BTreeMap<String, String>) -> LocatorResult<(Child, String)>
{
    let args = config.launch_arguments();
    let primary = &config.executable;
    let primary_err = match spawn(primary, &args, environment) {
        Ok(child) => return Ok((child, primary.clone())),
        Err(err) => err,
    };

    let Some(fallback) = config.fallback_executable.as_deref() else {
        return Err(LocatorError::ProcessStart {
            primary: primary.clone(),
            fallback: String::new(),
            reason: primary_err.to_string(),
        });
    };

    warn!(%primary, %primary_err, fallback, "primary debugger unavailable, trying fallback");
    match spawn(fallback, &args, environment) {
        Ok(child) => Ok((child, fallback.to_string())),
        Err(err) => Err(LocatorError::ProcessStart {
            primary: primary.clone(),
            fallback: fallback.to_string(),
            reason: format!("{primary}: {primary_err}; {fallback}: {err}"),
        }),
    }
}

fn start_error(config: &DebuggerConfig, reason: String) -> LocatorError
{
    LocatorError::ProcessStart {
        primary: config.executable.clone(),
        fallback: config.fallback_executable.clone().unwrap_or_default(),
        reason,
    }
}

fn spawn(executable: &str, args: &[String], environment: &BTreeMap<String, String>) -> io::Result<Child>
{
    Command::new(executable)
        .args(args)
        .envs(environment)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

fn spawn_pipe_reader(mut pipe: impl Read + Send + 'static, name: &str, sender: Sender<Vec<u8>>) -> io::Result<()>
{
    thread::Builder::new()
        .name(format!("symsrc-{name}"))
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match pipe.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if sender.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => {
                        trace!(%err, "debugger pipe read failed");
                        break;
                    }
                }
            }
        })?;
    Ok(())
}

fn wait_for_exit(child: &mut Child, budget: Duration) -> bool
{
    let deadline = Instant::now() + budget;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                trace!(%status, "debugger exited");
                return true;
            }
            Ok(None) => {}
            Err(err) => {
                debug!(%err, "could not poll debugger");
                return false;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn terminate(child: &Child)
{
    let _ = Command::new("kill").arg("-TERM").arg(child.id().to_string()).output();
}

#[cfg(not(unix))]
fn terminate(_child: &Child) {}

/// Byte offset where the prompt line starts, if the buffer ends with one.
///
/// Only the last non-empty line counts, so a prompt echoed in the middle of
/// older output is not mistaken for the end of the current reply.
fn prompt_offset(buffer: &[u8], prompt: &str) -> Option<usize>
{
    let marker = prompt.trim().as_bytes();
    if marker.is_empty() {
        return None;
    }
    let content_end = buffer.iter().rposition(|b| !b.is_ascii_whitespace())? + 1;
    let line_start = buffer[..content_end]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    buffer[line_start..content_end].starts_with(marker).then_some(line_start)
}

fn decode(bytes: &[u8]) -> String
{
    String::from_utf8_lossy(bytes).trim().to_string()
}
