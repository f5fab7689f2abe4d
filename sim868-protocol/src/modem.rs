use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{Command, OK_TOKEN};
use crate::error::Result;
use crate::power::{PowerConfig, PowerRetryController, PowerState};
use crate::session::{CommandOutcome, CommandSession};
use crate::telemetry::{self, TelemetryRecord};
use crate::transport::SerialChannel;

/// Token present in every `AT+CGNSINF` answer.
const GNSS_INFO_TOKEN: &str = "+CGNSINF";

/// Configuration for a SIM868 connection.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Watchdog for ordinary commands.
    pub command_timeout: Duration,
    /// Watchdog for `AT+CGNSINF`, whose answer is the longest we read.
    pub gnss_info_timeout: Duration,
    /// Startup handshake timing.
    pub power: PowerConfig,
    /// Pause between powering GNSS up and the first fix poll.
    pub gnss_settle: Duration,
    /// Polls of `AT+CGNSINF` before giving up on a fix.
    pub fix_attempts: u32,
    /// Pause between fix polls.
    pub fix_interval: Duration,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(100),
            gnss_info_timeout: Duration::from_millis(100),
            power: PowerConfig::default(),
            gnss_settle: Duration::from_secs(2),
            fix_attempts: 9,
            fix_interval: Duration::from_secs(2),
        }
    }
}

/// A SIM868 module on a serial channel, with a power control line.
pub struct Sim868<C, P, K = SystemClock> {
    session: CommandSession<C, K>,
    power_pin: P,
    power: PowerRetryController,
    config: ModemConfig,
}

#[cfg(feature = "serial")]
impl Sim868<crate::transport::serial::SerialPortChannel, crate::transport::serial::DtrPowerSignal> {
    /// Open `port_name` and use its DTR line as the power control signal.
    pub fn connect(port_name: &str, baud_rate: u32, config: ModemConfig) -> Result<Self> {
        let channel = crate::transport::serial::open_port(port_name, baud_rate)?;
        let power_pin = channel.dtr_power_signal()?;
        Ok(Self::new(channel, power_pin, SystemClock::new(), config))
    }
}

impl<C, P, K> Sim868<C, P, K>
where
    C: SerialChannel,
    P: OutputPin,
    K: Clock,
{
    pub fn new(channel: C, power_pin: P, clock: K, config: ModemConfig) -> Self {
        Self {
            session: CommandSession::new(channel, clock),
            power_pin,
            power: PowerRetryController::new(config.power.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    /// Probe the modem, power cycling it until it answers `AT`.
    pub fn start_module(&mut self) -> Result<()> {
        self.power.run(&mut self.session, &mut self.power_pin)
    }

    /// Power up the GNSS engine. Returns whether the modem acknowledged.
    pub fn enable_gnss(&mut self) -> Result<bool> {
        let outcome = self.send(&Command::GnssPower(true), OK_TOKEN)?;
        Ok(outcome.is_match())
    }

    /// Power down the GNSS engine. Returns whether the modem acknowledged.
    pub fn disable_gnss(&mut self) -> Result<bool> {
        let outcome = self.send(&Command::GnssPower(false), OK_TOKEN)?;
        Ok(outcome.is_match())
    }

    /// Query the current navigation snapshot.
    ///
    /// `Ok(None)` means no telemetry this cycle: the modem stayed silent or
    /// the sentence was malformed.
    pub fn gnss_info(&mut self) -> Result<Option<TelemetryRecord>> {
        let outcome = self.session.send(
            &Command::GnssInfo,
            GNSS_INFO_TOKEN,
            self.config.gnss_info_timeout,
        )?;
        Ok(outcome.text().and_then(telemetry::decode))
    }

    /// Power up GNSS and poll until a fix is reported.
    ///
    /// Gives up after `fix_attempts` polls, powering GNSS back down and
    /// returning `Ok(None)`.
    pub fn wait_for_fix(&mut self) -> Result<Option<TelemetryRecord>> {
        if !self.enable_gnss()? {
            warn!("GNSS power-on was not acknowledged");
        }
        self.session.clock().delay(self.config.gnss_settle);

        let attempts = self.config.fix_attempts;
        for attempt in 1..=attempts {
            match self.gnss_info()? {
                Some(record) if record.has_fix() => {
                    info!(
                        "GNSS fix after {} poll(s): {:.6}, {:.6}",
                        attempt, record.latitude, record.longitude
                    );
                    return Ok(Some(record));
                }
                Some(_) => debug!("no fix yet ({}/{})", attempt, attempts),
                None => debug!("no telemetry ({}/{})", attempt, attempts),
            }
            if attempt < attempts {
                self.session.clock().delay(self.config.fix_interval);
            }
        }

        warn!("no GNSS fix after {} poll(s), check the antenna", attempts);
        self.disable_gnss()?;
        Ok(None)
    }

    /// Send an arbitrary command line once, looking for `expected`.
    pub fn send_raw(&mut self, line: &str, expected: &str) -> Result<CommandOutcome> {
        let command = Command::raw(line)?;
        self.send(&command, expected)
    }

    fn send(&mut self, command: &Command, expected: &str) -> Result<CommandOutcome> {
        self.session.send(command, expected, self.config.command_timeout)
    }

    pub fn into_parts(self) -> (C, P, K) {
        let (channel, clock) = self.session.into_parts();
        (channel, self.power_pin, clock)
    }
}
