//! # Debugger Sessions
//!
//! A session is one long-lived debugger process driven over its standard
//! streams: write a command line, read until the prompt comes back.
//!
//! ## Ownership
//!
//! A session serves one conversation at a time. `send` takes `&mut self`, so
//! a command and its reply can never interleave with another caller's. Batch
//! lookups give each worker its own session through a [`SessionFactory`].
//!
//! ## Failure model
//!
//! `send` never fails. A reply either reached the prompt, ran out of time, or
//! found the process gone; the [`ReplyStatus`] says which and the text holds
//! whatever arrived. Only spawning can fail, with
//! [`LocatorError::ProcessStart`](crate::error::LocatorError::ProcessStart).
//!
//! ## Standard error
//!
//! Replies merge stdout and stderr, but the two pipes are read independently.
//! A stderr line written just before the prompt can arrive after it. Such a
//! line is missing from its own reply and is discarded as stale before the
//! next command is written, never attached to the next reply.

pub mod commands;
pub mod environment;
pub mod process;

use std::time::Duration;

pub use commands::CommandSet;
pub use environment::{capture_script_environment, parse_env_listing};
pub use process::{ProcessSession, ProcessSessionFactory};

use crate::error::LocatorResult;

/// How a reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus
{
    /// The debugger printed its prompt; the reply is complete
    Prompt,
    /// The timeout elapsed first; the text is whatever arrived in time
    TimedOut,
    /// The process exited or its input pipe broke
    Closed,
}

/// Text produced by one command, with the prompt stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReply
{
    pub text: String,
    pub status: ReplyStatus,
}

impl SessionReply
{
    #[must_use]
    pub fn complete(text: impl Into<String>) -> Self
    {
        Self {
            text: text.into(),
            status: ReplyStatus::Prompt,
        }
    }

    #[must_use]
    pub fn timed_out(text: impl Into<String>) -> Self
    {
        Self {
            text: text.into(),
            status: ReplyStatus::TimedOut,
        }
    }

    #[must_use]
    pub fn closed() -> Self
    {
        Self {
            text: String::new(),
            status: ReplyStatus::Closed,
        }
    }

    /// Whether the reply ended at the prompt.
    #[must_use]
    pub fn is_complete(&self) -> bool
    {
        self.status == ReplyStatus::Prompt
    }
}

/// A live conversation with a debugger.
pub trait DebuggerSession: Send
{
    /// Vocabulary this session speaks.
    fn commands(&self) -> &CommandSet;

    /// Write one command and collect its reply.
    ///
    /// Returns when the prompt appears or `timeout` elapses, whichever comes
    /// first. Output left over from an earlier timed-out command is discarded
    /// before the new command is written.
    fn send(&mut self, command: &str, timeout: Duration) -> SessionReply;

    /// Ask the debugger to quit, escalating to termination if it lingers.
    ///
    /// Idempotent: closing an already closed session does nothing.
    fn close(&mut self);

    /// Whether the session can no longer answer commands.
    fn is_closed(&self) -> bool;
}

/// Creates fresh sessions, for retries and for batch workers.
pub trait SessionFactory: Send + Sync
{
    /// Start a session ready to accept lookup commands.
    ///
    /// ## Errors
    ///
    /// Returns `ProcessStart` when no configured executable can be spawned.
    fn start(&self) -> LocatorResult<Box<dyn DebuggerSession>>;
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_reply_constructors()
    {
        assert!(SessionReply::complete("ok").is_complete());
        assert_eq!(SessionReply::timed_out("part").status, ReplyStatus::TimedOut);
        let closed = SessionReply::closed();
        assert_eq!(closed.status, ReplyStatus::Closed);
        assert!(closed.text.is_empty());
    }
}
