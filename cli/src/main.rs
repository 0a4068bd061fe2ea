mod commands;
mod config;
mod display;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use truenas_signal_client::TransportKind;

use config::default_config_path;

#[derive(Parser, Debug)]
#[command(name = "truenas-signal")]
#[command(about = "Remote power control for TrueNAS servers", long_about = None)]
struct Args {
    /// Server profile file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List saved servers
    List,
    /// Save a new server profile
    Add {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        fields: ProfileFields,
    },
    /// Change fields of a saved server
    Edit {
        server: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ProfileFields,
    },
    /// Delete a saved server
    Remove { server: String },
    /// Delete every saved server
    Clear,
    /// Query the system state
    Status {
        server: String,
        #[command(flatten)]
        key: KeyOverride,
    },
    /// Poll the system state until interrupted
    Watch {
        server: String,
        /// Seconds between polls
        #[arg(long, default_value_t = 10)]
        interval: u64,
        #[command(flatten)]
        key: KeyOverride,
    },
    /// Shut the server down
    Shutdown {
        server: String,
        #[command(flatten)]
        key: KeyOverride,
    },
    /// Reboot the server
    Restart {
        server: String,
        #[command(flatten)]
        key: KeyOverride,
    },
    /// Send a Wake-on-LAN magic packet
    Wake { server: String },
    /// Check API settings without saving them
    Test {
        #[arg(long)]
        endpoint: String,
        #[arg(long, env = "TRUENAS_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, default_value = "rest")]
        transport: TransportKind,
    },
}

#[derive(ClapArgs, Debug, Default)]
struct ProfileFields {
    /// MAC address for Wake-on-LAN, e.g. A1-B2-C3-D4-E5-F6
    #[arg(long)]
    mac: Option<String>,
    /// Broadcast address for Wake-on-LAN, e.g. 192.168.0.255
    #[arg(long)]
    broadcast: Option<String>,
    /// API base URL, e.g. https://truenas.local
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    /// rest or websocket
    #[arg(long)]
    transport: Option<TransportKind>,
}

#[derive(ClapArgs, Debug, Default)]
struct KeyOverride {
    /// Use this API key instead of the stored one
    #[arg(long, env = "TRUENAS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let path = args.config.unwrap_or_else(default_config_path);

    match args.command {
        Cmd::List => commands::list(&path),
        Cmd::Add { name, fields } => commands::add(&path, name, fields.into()),
        Cmd::Edit {
            server,
            name,
            fields,
        } => commands::edit(&path, &server, name, fields.into()),
        Cmd::Remove { server } => commands::remove(&path, &server),
        Cmd::Clear => commands::clear(&path),
        Cmd::Status { server, key } => commands::status(&path, &server, key.api_key).await,
        Cmd::Watch {
            server,
            interval,
            key,
        } => commands::watch(&path, &server, interval, key.api_key).await,
        Cmd::Shutdown { server, key } => commands::shutdown(&path, &server, key.api_key).await,
        Cmd::Restart { server, key } => commands::restart(&path, &server, key.api_key).await,
        Cmd::Wake { server } => commands::wake(&path, &server).await,
        Cmd::Test {
            endpoint,
            api_key,
            transport,
        } => commands::test(endpoint, api_key, transport).await,
    }
}

impl From<ProfileFields> for commands::ProfileEdit {
    fn from(f: ProfileFields) -> Self {
        Self {
            mac: f.mac,
            broadcast: f.broadcast,
            endpoint: f.endpoint,
            api_key: f.api_key,
            transport: f.transport,
        }
    }
}
