use std::time::Duration;

use log::trace;

use crate::clock::{self, Clock};
use crate::error::Result;
use crate::transport::SerialChannel;

/// Collects whatever the modem sends within a watchdog window.
pub struct ResponseCollector;

impl ResponseCollector {
    /// Poll `channel` until `watchdog` has elapsed on `clock`, reading one byte
    /// per poll that finds data.
    ///
    /// Returns `Ok(None)` only when not a single byte arrived during the whole
    /// window. Received bytes that are not valid UTF-8 are an error, never a
    /// timeout.
    pub fn collect<C, K>(
        channel: &mut C,
        clock: &K,
        watchdog: Duration,
    ) -> Result<Option<String>>
    where
        C: SerialChannel + ?Sized,
        K: Clock + ?Sized,
    {
        let watchdog_ms = clock::as_ms(watchdog);
        let start = clock.now_ms();
        let mut buf = Vec::new();

        while clock.elapsed_ms(start) < watchdog_ms {
            if channel.has_data_available()? {
                buf.push(channel.read_one_byte()?);
            }
        }

        if buf.is_empty() {
            trace!("RX: nothing within {} ms", watchdog_ms);
            return Ok(None);
        }

        trace!("RX {} bytes: {:02X?}", buf.len(), buf);
        Ok(Some(String::from_utf8(buf)?))
    }
}
