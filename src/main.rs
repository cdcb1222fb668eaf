//! Binary entrypoint for the Meshconsole CLI.
//!
//! Commands:
//! - `start [--port <path>]` - connect to the radio and open the interactive console
//! - `init` - write a starter `meshconsole.toml`
//! - `ports` - list serial ports that may carry a radio
//! - `send [--to <node>] [--channel <n>] <text>` - one-shot broadcast, or an
//!   acknowledged direct message whose outcome sets the exit status
//! - `probe [--port <path>]` - connect, collect the node database and print a JSON summary
//!
//! See the library crate docs for module-level details: `meshconsole::`.
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use meshconsole::config::Config;
use meshconsole::console::{
    self, AckCorrelator, Console, ConsoleError, DeliveryOutcome, DirectMessenger, Renderer,
};
use meshconsole::meshtastic::{link, Connection, Resolution};
use meshconsole::validation::validate_message_text;

#[derive(Parser)]
#[command(name = "meshconsole")]
#[command(about = "Operator console for Meshtastic mesh radios")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "meshconsole.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the radio and start the interactive console
    Start {
        /// Meshtastic device port (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// List available serial ports
    Ports,
    /// Send one message and exit
    Send {
        /// Direct message destination (node id or name); broadcast when omitted
        #[arg(long)]
        to: Option<String>,
        /// Broadcast channel index (defaults to console.default_channel)
        #[arg(long)]
        channel: Option<u32>,
        /// Meshtastic device port
        #[arg(short, long)]
        port: Option<String>,
        /// Message text
        text: String,
    },
    /// Connect, collect device info and print a JSON summary
    Probe {
        /// Meshtastic device port
        #[arg(short, long)]
        port: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load_or_default(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { port } => {
            let mut config = Config::load_or_default(&cli.config).await?;
            if let Some(p) = port {
                config.meshtastic.port = p;
            }
            info!("Starting Meshconsole v{}", env!("CARGO_PKG_VERSION"));
            run_console(config).await?;
        }
        Commands::Init => {
            if tokio::fs::try_exists(&cli.config).await.unwrap_or(false) {
                bail!("{} already exists; not overwriting", cli.config);
            }
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
            println!("Edit [meshtastic] port to point at your radio, then run: meshconsole start");
        }
        Commands::Ports => {
            let ports = link::list_ports()?;
            if ports.is_empty() {
                println!("No serial ports found.");
            }
            for p in ports {
                match p.description {
                    Some(desc) => println!("{:<24} {:<10} {}", p.name, p.kind, desc),
                    None => println!("{:<24} {}", p.name, p.kind),
                }
            }
        }
        Commands::Send {
            to,
            channel,
            port,
            text,
        } => {
            let mut config = Config::load_or_default(&cli.config).await?;
            if let Some(p) = port {
                config.meshtastic.port = p;
            }
            let code = send_once(&config, to, channel, &text).await?;
            std::process::exit(code);
        }
        Commands::Probe { port } => {
            let mut config = Config::load_or_default(&cli.config).await?;
            if let Some(p) = port {
                config.meshtastic.port = p;
            }
            let ok = probe(&config).await?;
            std::process::exit(if ok { 0 } else { 1 });
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<Connection> {
    let mut conn = Connection::connect_serial(&config.meshtastic).await?;
    let limit = Duration::from_secs(config.meshtastic.config_timeout_secs);
    if !conn.wait_for_config(limit).await {
        warn!(
            "Radio did not finish sending its configuration within {}s; continuing",
            config.meshtastic.config_timeout_secs
        );
    }
    Ok(conn)
}

async fn run_console(config: Config) -> Result<()> {
    println!("Connecting to {}...", config.meshtastic.port);
    let mut conn = connect(&config).await?;
    let correlator = Arc::new(AckCorrelator::new());
    let (display, pump) = console::spawn_event_pump(conn.take_events(), correlator.clone());
    let console = Console::new(
        Arc::new(conn.radio.clone()),
        conn.state.clone(),
        correlator,
        config.console.clone(),
        console::stdout_output(),
    );
    console.run(display, console::spawn_stdin_reader()).await;
    conn.shutdown().await;
    pump.abort();
    Ok(())
}

/// Exit status: 0 sent/delivered, 1 failed or error, 2 unconfirmed.
async fn send_once(
    config: &Config,
    to: Option<String>,
    channel: Option<u32>,
    text: &str,
) -> Result<i32> {
    validate_message_text(text)?;
    let renderer = Renderer::new(config.console.color);
    let mut conn = connect(config).await?;
    let correlator = Arc::new(AckCorrelator::new());
    let (_display, pump) = console::spawn_event_pump(conn.take_events(), correlator.clone());
    let messenger = DirectMessenger::new(
        Arc::new(conn.radio.clone()),
        correlator.clone(),
        config.console.ack_timeout(),
    );

    let result: Result<i32, ConsoleError> = match to {
        None => {
            let channel = channel.unwrap_or(config.console.default_channel);
            messenger.broadcast(text, channel).map(|id| {
                println!("Broadcast sent on channel {} (id {}).", channel, id);
                0
            })
        }
        Some(target) => {
            let resolution = conn
                .state
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .nodes
                .resolve(&target);
            match resolution {
                Resolution::Found(dest) => {
                    println!(
                        "Sending direct message to {} and waiting for acknowledgment...",
                        target
                    );
                    messenger.send_and_wait(&dest, text).await.map(|outcome| {
                        print!("{}", renderer.outcome(&target, &outcome));
                        match outcome {
                            DeliveryOutcome::Delivered => 0,
                            DeliveryOutcome::Failed { .. } => 1,
                            DeliveryOutcome::Unconfirmed => 2,
                        }
                    })
                }
                Resolution::Unknown => Err(ConsoleError::UnknownNode(target)),
                Resolution::Ambiguous(ids) => Err(ConsoleError::AmbiguousNode { name: target, ids }),
            }
        }
    };

    correlator.close();
    conn.shutdown().await;
    pump.abort();
    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            eprint!("{}", renderer.error(&format!("Error: {}", e)));
            Ok(1)
        }
    }
}

async fn probe(config: &Config) -> Result<bool> {
    let mut conn = Connection::connect_serial(&config.meshtastic).await?;
    let limit = Duration::from_secs(config.meshtastic.config_timeout_secs);
    let complete = conn.wait_for_config(limit).await;
    let report = {
        let state = conn.state.read().unwrap_or_else(|e| e.into_inner());
        let channels: Vec<_> = state
            .channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| {
                serde_json::json!({
                    "index": c.index,
                    "name": c.name,
                    "role": c.role.label(),
                })
            })
            .collect();
        serde_json::json!({
            "port": config.meshtastic.port,
            "config_complete": complete,
            "my_node": state.my_id(),
            "owner": state.my_node().map(|n| n.long_name.clone()),
            "firmware": state.metadata.as_ref().map(|m| m.firmware_version.clone()),
            "reboot_count": state.reboot_count,
            "nodes": state.nodes.len(),
            "channels": channels,
        })
    };
    conn.shutdown().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(complete)
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Warn);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // With a log file, only mirror to the terminal at -v and above so
            // log lines do not interleave with console output.
            let mirror = verbosity > 0 && atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if mirror {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
