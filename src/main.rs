use clap::{Parser, Subcommand};
use tracing::{error, info};
use tvrelay::{
    channels::{load_catalog, Channel},
    create_app, create_relay_app,
    protocol::{CommandKind, RemoteMessage},
    relay::Relay,
    remote_client::{RemoteClient, RECONNECT_DELAY},
    settings::{Mode, Settings},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Listen port (overrides config and environment)
    #[arg(long)]
    port: Option<u16>,

    /// Deployment mode (overrides config and environment)
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy and relay (default)
    Serve,
    /// Send remote-control commands through a running relay
    Send {
        /// Relay WebSocket URL
        #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
        url: String,

        /// Jump the display's focus to this index first
        #[arg(long, allow_negative_numbers = true)]
        navigate: Option<i64>,

        /// Commands to send in order (up, down, left, right, select, back, home, mute, volume_up, volume_down)
        commands: Vec<CommandKind>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Some(Command::Send { ref url, navigate, ref commands }) => send(url, navigate, commands).await,
        Some(Command::Serve) | None => serve(&args).await,
    }
}

async fn serve(args: &Args) -> anyhow::Result<()> {
    let mut settings = Settings::load(&args.config)?;
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(mode) = args.mode {
        settings.server.mode = mode;
    }
    info!("Configuration loaded from {}: {:?}", args.config, settings);

    let channels: Vec<Channel> = match &settings.catalog.path {
        Some(path) => match load_catalog(path) {
            Ok(c) => {
                info!("Loaded {} channels from {}", c.len(), path.display());
                c
            }
            Err(e) => {
                error!("Failed to load channel catalog from {}: {}", path.display(), e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let relay = Relay::spawn();
    let app = create_app(&settings, channels, relay.clone())?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Listening on http://{} (mode: {:?})", addr, settings.server.mode);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let http = async { axum::serve(listener, app).await };

    match settings.relay.port {
        Some(port) => {
            let relay_addr = format!("{}:{}", settings.server.host, port);
            info!("Relay listening on ws://{}", relay_addr);
            let relay_listener = tokio::net::TcpListener::bind(&relay_addr).await?;
            let relay_server = async { axum::serve(relay_listener, create_relay_app(relay)).await };
            tokio::try_join!(http, relay_server)?;
        }
        None => {
            info!("Relay attached to HTTP listener at {}", settings.relay.path);
            http.await?;
        }
    }
    Ok(())
}

async fn send(url: &str, navigate: Option<i64>, commands: &[CommandKind]) -> anyhow::Result<()> {
    let mut client = RemoteClient::connect_with_retry(url, 5, RECONNECT_DELAY).await?;
    client.wait_connected().await?;
    info!("Connected to relay at {}", url);

    if let Some(index) = navigate {
        client.send(&RemoteMessage::Navigate { index }).await?;
    }
    for command in commands {
        client.send_command(*command).await?;
        info!("Sent command: {}", command.as_str());
    }
    client.close().await
}
