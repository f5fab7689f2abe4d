use std::fmt;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::clock::Clock;
use crate::collector::ResponseCollector;
use crate::command::Command;
use crate::error::{ModemError, Result};
use crate::transport::SerialChannel;

/// Rendering of [`CommandOutcome::Timeout`] in logs and on the console.
pub const TIMEOUT_SENTINEL: &str = "TIMEOUT";

/// The result of one command exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The response contained the expected token.
    Success(String),
    /// Bytes arrived but the expected token was not among them.
    Mismatch(String),
    /// Nothing at all arrived within the watchdog window.
    Timeout,
}

impl CommandOutcome {
    /// Classify a collected response against `expected`.
    pub fn classify(raw: Option<String>, expected: &str) -> Self {
        match raw {
            Some(text) if text.contains(expected) => CommandOutcome::Success(text),
            Some(text) => CommandOutcome::Mismatch(text),
            None => CommandOutcome::Timeout,
        }
    }

    /// Returns `true` if the expected token was found.
    pub fn is_match(&self) -> bool {
        matches!(self, CommandOutcome::Success(_))
    }

    /// Returns `true` if nothing was received.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandOutcome::Timeout)
    }

    /// The text the modem sent, if it sent anything.
    pub fn text(&self) -> Option<&str> {
        match self {
            CommandOutcome::Success(text) | CommandOutcome::Mismatch(text) => Some(text),
            CommandOutcome::Timeout => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            CommandOutcome::Success(text) | CommandOutcome::Mismatch(text) => Some(text),
            CommandOutcome::Timeout => None,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text().unwrap_or(TIMEOUT_SENTINEL))
    }
}

/// Sends one command at a time over a serial channel.
///
/// `send` takes `&mut self`, so a second command cannot start before the
/// previous one has returned. Wrap the session in a
/// [`SharedSession`](crate::shared::SharedSession) to use it from several threads.
pub struct CommandSession<C, K> {
    channel: C,
    clock: K,
}

impl<C, K> CommandSession<C, K>
where
    C: SerialChannel,
    K: Clock,
{
    pub fn new(channel: C, clock: K) -> Self {
        Self { channel, clock }
    }

    /// Write `command` plus CR LF, then collect for `watchdog` and look for
    /// `expected` anywhere in the response.
    pub fn send(
        &mut self,
        command: &Command,
        expected: &str,
        watchdog: Duration,
    ) -> Result<CommandOutcome> {
        let bytes = command.to_bytes();
        trace!("TX: {:?}", command.as_str());
        self.channel.write(&bytes).map_err(ModemError::Io)?;

        let raw = ResponseCollector::collect(&mut self.channel, &self.clock, watchdog)?;
        let outcome = CommandOutcome::classify(raw, expected);

        match &outcome {
            CommandOutcome::Success(_) => debug!("{} -> {}", command, expected),
            CommandOutcome::Mismatch(text) => {
                debug!("{} -> no {:?} in {:?}", command, expected, text)
            }
            CommandOutcome::Timeout => {
                warn!("{}: no response within {} ms", command, watchdog.as_millis())
            }
        }
        Ok(outcome)
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_parts(self) -> (C, K) {
        (self.channel, self.clock)
    }
}
