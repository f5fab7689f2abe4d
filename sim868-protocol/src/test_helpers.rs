use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::io;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::clock::{self, Clock};
use crate::transport::SerialChannel;

/// A scripted modem: every complete line written pops the next reply into the
/// receive queue. When the script runs dry the fallback reply (if any) is used.
#[derive(Debug, Default)]
pub struct MockChannel {
    pub written: Vec<u8>,
    pending: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    fallback: Option<Vec<u8>>,
    rx: VecDeque<u8>,
}

impl MockChannel {
    /// A modem that never answers.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_replies<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        let mut channel = Self::default();
        for reply in replies {
            channel.push_reply(reply.as_bytes());
        }
        channel
    }

    /// A modem that gives the same reply to every line.
    pub fn always(reply: &str) -> Self {
        Self {
            fallback: Some(reply.as_bytes().to_vec()),
            ..Self::default()
        }
    }

    pub fn push_reply(&mut self, reply: &[u8]) {
        self.replies.push_back(reply.to_vec());
    }

    /// Bytes that arrive unprompted, as if already on the wire.
    pub fn push_unsolicited(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Written lines with their terminators removed.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written)
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }
}

impl SerialChannel for MockChannel {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        for &b in bytes {
            self.pending.push(b);
            if self.pending.ends_with(b"\r\n") {
                self.pending.clear();
                let reply = self.replies.pop_front().or_else(|| self.fallback.clone());
                if let Some(reply) = reply {
                    self.rx.extend(reply);
                }
            }
        }
        Ok(())
    }

    fn has_data_available(&mut self) -> io::Result<bool> {
        Ok(!self.rx.is_empty())
    }

    fn read_one_byte(&mut self) -> io::Result<u8> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no data"))
    }
}

/// A clock that advances `step` milliseconds every time it is read and by the
/// full duration on `delay`, so busy-poll loops terminate without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<u64>,
    step: u64,
}

impl ManualClock {
    pub fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }

    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    fn delay(&self, duration: Duration) {
        self.now.set(self.now.get() + clock::as_ms(duration));
    }
}

/// An output pin that records every level it was driven to.
#[derive(Debug, Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}
