use clap::{Arg, Command};
use emulator::{Dialect, EmulatorConfig};
use std::convert::TryFrom;
use tracing::info;

fn validate_port_value(value: &str) -> Result<u16, String> {
    value
        .parse::<u16>()
        .map_err(|_| "Invalid port number".to_owned())
}

fn validate_delay_value(value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| "Invalid delay value".to_owned())
}

fn validate_dialect(value: &str) -> Result<Dialect, String> {
    Dialect::try_from(value)
}

fn validate_ports_list(value: &str) -> Result<String, String> {
    for part in value.split(',') {
        part.trim()
            .parse::<u16>()
            .map_err(|_| format!("Invalid SIM port '{}'", part))?;
    }
    Ok(value.to_owned())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "emulator starting");

    let matches = Command::new("SMS Gateway Emulator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Emulates a multi-port SMS gateway device for demos and testing")
        .arg(
            Arg::new("port")
                .help("The port of the local machine to listen on")
                .short('p')
                .long("port")
                .value_parser(validate_port_value)
                .default_value("8090"),
        )
        .arg(
            Arg::new("dialect")
                .help("Firmware dialect to imitate: modern, cgi, or bare")
                .short('t')
                .long("dialect")
                .value_parser(validate_dialect)
                .default_value("modern"),
        )
        .arg(
            Arg::new("username")
                .help("Basic auth username")
                .short('u')
                .long("username")
                .default_value("admin"),
        )
        .arg(
            Arg::new("password")
                .help("Basic auth password")
                .short('w')
                .long("password")
                .default_value("admin"),
        )
        .arg(
            Arg::new("ports")
                .help("Comma-separated SIM ports the generator deposits into")
                .long("sim-ports")
                .value_parser(validate_ports_list)
                .default_value("1,2,3,4"),
        )
        .arg(
            Arg::new("delay")
                .help("Milliseconds between generated messages (0 disables)")
                .short('d')
                .long("delay")
                .value_parser(validate_delay_value)
                .default_value("15000"),
        )
        .arg(
            Arg::new("file")
                .help("Seed file with one 'sender|content|port' line per message")
                .short('f')
                .long("file"),
        )
        .get_matches();

    let ports: Vec<u16> = matches
        .get_one::<String>("ports")
        .expect("ports has a default")
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect();

    let config = EmulatorConfig {
        bind_port: *matches.get_one::<u16>("port").expect("port has a default"),
        username: matches
            .get_one::<String>("username")
            .expect("username has a default")
            .clone(),
        password: matches
            .get_one::<String>("password")
            .expect("password has a default")
            .clone(),
        dialect: *matches
            .get_one::<Dialect>("dialect")
            .expect("dialect has a default"),
        ports,
        delay: *matches
            .get_one::<u64>("delay")
            .expect("delay has a default"),
        seed_file: matches.get_one::<String>("file").cloned(),
    };

    if let Err(error) = emulator::run(config).await {
        eprintln!("FATAL: emulator failed: {}", error);
        std::process::exit(1);
    }
}
