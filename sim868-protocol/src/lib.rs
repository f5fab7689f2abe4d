pub mod clock;
pub mod collector;
pub mod command;
pub mod error;
pub mod modem;
pub mod power;
pub mod session;
pub mod shared;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use clock::{Clock, SystemClock};
pub use collector::ResponseCollector;
pub use command::Command;
pub use error::{ModemError, Result};
pub use modem::{ModemConfig, Sim868};
pub use power::{NoPowerPin, PowerConfig, PowerRetryController, PowerState};
pub use session::{CommandOutcome, CommandSession};
pub use shared::SharedSession;
pub use telemetry::{GnssTimestamp, TelemetryRecord};
pub use transport::SerialChannel;
