use std::convert::Infallible;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info, warn};

use crate::clock::{self, Clock};
use crate::command::{Command, OK_TOKEN};
use crate::error::{ModemError, Result};
use crate::session::CommandSession;
use crate::transport::SerialChannel;

/// Timing knobs for bringing the modem up.
#[derive(Debug, Clone)]
pub struct PowerConfig {
    /// Give up once this much time has passed since probing began.
    pub startup_timeout: Duration,
    /// Keep probing within one power cycle until this much time has passed.
    /// Zero means a single probe per power cycle.
    pub probe_window: Duration,
    /// Watchdog for each `ATE1` / `AT` exchange.
    pub command_timeout: Duration,
    /// How long the power signal is held high during a power cycle.
    pub pulse_hold: Duration,
    /// Pause after a power cycle, while the modem boots.
    pub retry_delay: Duration,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(6),
            probe_window: Duration::ZERO,
            command_timeout: Duration::from_millis(100),
            pulse_hold: Duration::from_secs(1),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Where the startup handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Idle,
    Probing,
    Ready,
    Failed,
}

/// An `OutputPin` for modems without a host-controlled power line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerPin;

impl ErrorType for NoPowerPin {
    type Error = Infallible;
}

impl OutputPin for NoPowerPin {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}

/// Probes the modem with `ATE1` + `AT` and power-cycles it until it answers
/// `OK` or the startup deadline passes.
#[derive(Debug)]
pub struct PowerRetryController {
    config: PowerConfig,
    state: PowerState,
    probes: u32,
    power_cycles: u32,
}

impl PowerRetryController {
    pub fn new(config: PowerConfig) -> Self {
        Self {
            config,
            state: PowerState::Idle,
            probes: 0,
            power_cycles: 0,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Liveness probes sent during the last run.
    pub fn probes(&self) -> u32 {
        self.probes
    }

    /// Power cycles performed during the last run.
    pub fn power_cycles(&self) -> u32 {
        self.power_cycles
    }

    /// Drive the handshake to `Ready`, or fail with
    /// [`ModemError::PowerRetryExhausted`] once `startup_timeout` has elapsed.
    ///
    /// Transport and pin errors abort the run immediately and leave the
    /// controller in `Failed`.
    pub fn run<C, K, P>(&mut self, session: &mut CommandSession<C, K>, pin: &mut P) -> Result<()>
    where
        C: SerialChannel,
        K: Clock,
        P: OutputPin,
    {
        self.probes = 0;
        self.power_cycles = 0;
        self.state = PowerState::Probing;

        let result = self.probe_loop(session, pin);
        self.state = match result {
            Ok(()) => PowerState::Ready,
            Err(_) => PowerState::Failed,
        };
        result
    }

    fn probe_loop<C, K, P>(&mut self, session: &mut CommandSession<C, K>, pin: &mut P) -> Result<()>
    where
        C: SerialChannel,
        K: Clock,
        P: OutputPin,
    {
        let deadline = Deadline::new(session.clock(), self.config.startup_timeout);
        let window_ms = clock::as_ms(self.config.probe_window);
        debug!("probing modem (deadline {} ms)", deadline.limit_ms);

        loop {
            let cycle_start = session.clock().now_ms();
            loop {
                if deadline.remaining(session.clock()).is_zero() {
                    return Err(self.exhausted(session.clock(), &deadline));
                }
                if self.probe(session, &deadline)? {
                    info!(
                        "modem ready after {} probe(s), {} power cycle(s)",
                        self.probes, self.power_cycles
                    );
                    return Ok(());
                }
                if session.clock().elapsed_ms(cycle_start) >= window_ms {
                    break;
                }
            }

            let remaining = deadline.remaining(session.clock());
            if remaining.is_zero() {
                return Err(self.exhausted(session.clock(), &deadline));
            }
            self.power_cycle(session.clock(), pin, self.config.pulse_hold.min(remaining))?;

            let remaining = deadline.remaining(session.clock());
            session.clock().delay(self.config.retry_delay.min(remaining));
        }
    }

    fn exhausted<K: Clock>(&self, clock: &K, deadline: &Deadline) -> ModemError {
        let elapsed_ms = deadline.elapsed_ms(clock);
        warn!("modem did not come up within {} ms", elapsed_ms);
        ModemError::PowerRetryExhausted {
            probes: self.probes,
            power_cycles: self.power_cycles,
            elapsed_ms,
        }
    }

    /// One `ATE1` + `AT` exchange. Only the `AT` reply decides readiness.
    ///
    /// Each watchdog is cut short so the exchange ends by the deadline.
    fn probe<C, K>(
        &mut self,
        session: &mut CommandSession<C, K>,
        deadline: &Deadline,
    ) -> Result<bool>
    where
        C: SerialChannel,
        K: Clock,
    {
        self.probes += 1;
        let timeout = self.config.command_timeout;

        let echo_timeout = timeout.min(deadline.remaining(session.clock()));
        session.send(&Command::EchoOn, OK_TOKEN, echo_timeout)?;

        let remaining = deadline.remaining(session.clock());
        if remaining.is_zero() {
            return Ok(false);
        }
        Ok(session.send(&Command::Attention, OK_TOKEN, timeout.min(remaining))?.is_match())
    }

    fn power_cycle<K, P>(&mut self, clock: &K, pin: &mut P, hold: Duration) -> Result<()>
    where
        K: Clock,
        P: OutputPin,
    {
        self.power_cycles += 1;
        warn!("no answer to AT, power cycling (hold {} ms)", hold.as_millis());
        pin.set_high().map_err(signal_error)?;
        clock.delay(hold);
        pin.set_low().map_err(signal_error)?;
        Ok(())
    }
}

fn signal_error<E: embedded_hal::digital::Error>(e: E) -> ModemError {
    ModemError::PowerSignal {
        kind: e.kind(),
        detail: format!("{e:?}"),
    }
}

/// The overall startup deadline, measured from when probing began.
struct Deadline {
    start: u64,
    limit_ms: u64,
}

impl Deadline {
    fn new<K: Clock>(clock: &K, limit: Duration) -> Self {
        Self {
            start: clock.now_ms(),
            limit_ms: clock::as_ms(limit),
        }
    }

    fn elapsed_ms<K: Clock>(&self, clock: &K) -> u64 {
        clock.elapsed_ms(self.start)
    }

    fn remaining<K: Clock>(&self, clock: &K) -> Duration {
        Duration::from_millis(self.limit_ms.saturating_sub(self.elapsed_ms(clock)))
    }
}

impl Default for PowerRetryController {
    fn default() -> Self {
        Self::new(PowerConfig::default())
    }
}
