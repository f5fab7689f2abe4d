mod cli;

use clap::Parser;
use embedded_hal::digital::OutputPin;
use log::info;

use sim868_protocol::transport::serial::{self, SerialPortChannel};
use sim868_protocol::{ModemError, NoPowerPin, Result, Sim868, SystemClock};

use cli::{Action, Cli};

fn main() {
    let cli = Cli::parse();
    let port_name = match cli.action {
        Action::Ports => None,
        _ => Some(cli.require_port().unwrap_or_else(|e| e.exit())),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level().as_str()),
    )
    .init();

    if let Err(e) = run(&cli, port_name) {
        eprintln!("error: {e}");
        if matches!(e, ModemError::PowerRetryExhausted { .. }) {
            eprintln!();
            eprintln!("Troubleshooting:");
            eprintln!("  1. Check the modem supply and that PWRKEY is wired to DTR");
            eprintln!("     (or pass --no-power-pin and power it on by hand)");
            eprintln!("  2. Check the baud rate (--baud), SIM868 defaults to auto-baud");
            eprintln!("  3. Raise --startup-ms if the modem boots slowly");
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli, port_name: Option<&str>) -> Result<()> {
    let Some(port_name) = port_name else {
        for name in serial::list_ports()? {
            println!("{name}");
        }
        return Ok(());
    };

    let config = cli.modem_config();

    if cli.no_power_pin {
        let channel = serial::open_port(port_name, cli.baud)?;
        let mut modem = Sim868::new(channel, NoPowerPin, SystemClock::new(), config);
        execute(cli, &mut modem)
    } else {
        let mut modem = Sim868::connect(port_name, cli.baud, config)?;
        execute(cli, &mut modem)
    }
}

fn execute<P: OutputPin>(cli: &Cli, modem: &mut Sim868<SerialPortChannel, P>) -> Result<()> {
    if cli.start || matches!(cli.action, Action::Start) {
        modem.start_module()?;
        info!("modem is ready");
        if matches!(cli.action, Action::Start) {
            println!("Modem is ready.");
            return Ok(());
        }
    }

    match &cli.action {
        Action::Ports | Action::Start => {}
        Action::GnssOn => println!("GNSS power on: {}", ack(modem.enable_gnss()?)),
        Action::GnssOff => println!("GNSS power off: {}", ack(modem.disable_gnss()?)),
        Action::Info => match modem.gnss_info()? {
            Some(record) => println!("{record}"),
            None => println!("No telemetry available."),
        },
        Action::Fix { .. } => match modem.wait_for_fix()? {
            Some(record) => println!("{record}"),
            None => println!("No GNSS fix, check the antenna."),
        },
        Action::Send { line, expect } => {
            let outcome = modem.send_raw(line, expect)?;
            println!("{}", outcome.to_string().trim_end());
            println!("matched {:?}: {}", expect, outcome.is_match());
        }
    }
    Ok(())
}

fn ack(matched: bool) -> &'static str {
    if matched { "OK" } else { "not acknowledged" }
}
