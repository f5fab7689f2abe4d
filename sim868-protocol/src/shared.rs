use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::Clock;
use crate::command::Command;
use crate::error::{ModemError, Result};
use crate::session::{CommandOutcome, CommandSession};
use crate::transport::SerialChannel;

/// A [`CommandSession`] that can be cloned across threads.
///
/// The lock is held for the whole exchange, so commands from different
/// threads never interleave on the wire.
pub struct SharedSession<C, K> {
    inner: Arc<Mutex<CommandSession<C, K>>>,
}

impl<C, K> Clone for SharedSession<C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, K> SharedSession<C, K>
where
    C: SerialChannel,
    K: Clock,
{
    pub fn new(session: CommandSession<C, K>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn send(
        &self,
        command: &Command,
        expected: &str,
        watchdog: Duration,
    ) -> Result<CommandOutcome> {
        let mut session = self.inner.lock().map_err(|_| ModemError::SessionPoisoned)?;
        session.send(command, expected, watchdog)
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut CommandSession<C, K>) -> R) -> Result<R> {
        let mut session = self.inner.lock().map_err(|_| ModemError::SessionPoisoned)?;
        Ok(f(&mut session))
    }
}
