use std::time::Duration;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use log::LevelFilter;

use sim868_protocol::transport::serial::DEFAULT_BAUD_RATE;
use sim868_protocol::{ModemConfig, PowerConfig};

/// Drive a SIM868 GSM/GNSS module over a serial port.
#[derive(Debug, Parser)]
#[command(name = "sim868", version)]
pub struct Cli {
    /// Serial port the modem is attached to (e.g. /dev/ttyUSB0, COM3).
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Serial baud rate.
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE, global = true)]
    pub baud: u32,

    /// Watchdog for ordinary commands, in milliseconds.
    #[arg(long, default_value_t = 100, global = true)]
    pub timeout_ms: u64,

    /// Watchdog for AT+CGNSINF, in milliseconds.
    #[arg(long, default_value_t = 100, global = true)]
    pub gnss_timeout_ms: u64,

    /// Give up on the startup handshake after this many milliseconds.
    #[arg(long, default_value_t = 6_000, global = true)]
    pub startup_ms: u64,

    /// Keep probing this long before each power cycle, in milliseconds.
    #[arg(long, default_value_t = 0, global = true)]
    pub probe_window_ms: u64,

    /// How long to hold the power line during a power cycle, in milliseconds.
    #[arg(long, default_value_t = 1_000, global = true)]
    pub pulse_ms: u64,

    /// Pause after each power cycle, in milliseconds.
    #[arg(long, default_value_t = 2_000, global = true)]
    pub retry_delay_ms: u64,

    /// The modem is powered externally; never toggle DTR.
    #[arg(long, global = true)]
    pub no_power_pin: bool,

    /// Run the startup handshake before the command.
    #[arg(long, global = true)]
    pub start: bool,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// List serial ports.
    Ports,
    /// Probe the modem, power cycling until it answers.
    Start,
    /// Power up the GNSS engine.
    GnssOn,
    /// Power down the GNSS engine.
    GnssOff,
    /// Print one navigation snapshot.
    Info,
    /// Power up GNSS and wait for a position fix.
    Fix {
        /// Number of AT+CGNSINF polls.
        #[arg(long, default_value_t = 9)]
        attempts: u32,
        /// Pause between polls, in milliseconds.
        #[arg(long, default_value_t = 2_000)]
        interval_ms: u64,
        /// Pause after powering GNSS up, before the first poll, in milliseconds.
        #[arg(long, default_value_t = 2_000)]
        settle_ms: u64,
    },
    /// Send one command line and print the response.
    Send {
        /// Command text without line terminator.
        line: String,
        /// Token that marks success.
        #[arg(long, default_value = "OK")]
        expect: String,
    },
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// The port to open. Every action except `ports` needs one.
    pub fn require_port(&self) -> Result<&str, clap::Error> {
        self.port.as_deref().ok_or_else(|| {
            Cli::command().error(
                ErrorKind::MissingRequiredArgument,
                "--port <PORT> is required for this command",
            )
        })
    }

    pub fn modem_config(&self) -> ModemConfig {
        let command_timeout = Duration::from_millis(self.timeout_ms);
        let mut config = ModemConfig {
            command_timeout,
            gnss_info_timeout: Duration::from_millis(self.gnss_timeout_ms),
            power: PowerConfig {
                startup_timeout: Duration::from_millis(self.startup_ms),
                probe_window: Duration::from_millis(self.probe_window_ms),
                command_timeout,
                pulse_hold: Duration::from_millis(self.pulse_ms),
                retry_delay: Duration::from_millis(self.retry_delay_ms),
            },
            ..ModemConfig::default()
        };
        if let Action::Fix {
            attempts,
            interval_ms,
            settle_ms,
        } = self.action
        {
            config.fix_attempts = attempts;
            config.fix_interval = Duration::from_millis(interval_ms);
            config.gnss_settle = Duration::from_millis(settle_ms);
        }
        config
    }
}
