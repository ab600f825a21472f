use anyhow::{bail, Context, Result};
use clap::Parser;
use lingo_bridge::{
    create_router, AccessGate, AppState, AudioSource, CaptureDevice, CaptureDeviceFactory,
    ChatController, Config, HttpTranslationGateway, Invite, NatsTransport, RecordingSession, Role,
    SyncChannel, TimedPlayer,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "lingo-bridge", version, about = "Serve one tab of a two-language chat")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/lingo-bridge")]
    config: String,

    /// Role to take: a/english or b/spanish
    #[arg(short, long, conflicts_with = "invite")]
    role: Option<Role>,

    /// Invite link carrying the role and access key
    #[arg(long)]
    invite: Option<String>,

    /// Override the HTTP port from the config
    #[arg(short, long)]
    port: Option<u16>,

    /// Print invite links for both roles and exit
    #[arg(long)]
    print_invites: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingo_bridge=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let gate = AccessGate::new(cfg.access.secret.clone());
    if cli.print_invites {
        for role in [Role::A, Role::B] {
            println!("{}: {}", role, gate.invite_link(&cfg.access.invite_base, role)?);
        }
        return Ok(());
    }

    let role = match (cli.role, cli.invite) {
        (Some(role), _) => role,
        (None, Some(link)) => gate.verify(&Invite::parse(&link)?)?,
        (None, None) => bail!("Pass --role or --invite to choose who this tab speaks for"),
    };

    let channel = match &cfg.sync.nats_url {
        Some(url) => match NatsTransport::connect(url, &cfg.chat.channel).await {
            Ok(transport) => SyncChannel::open(&cfg.chat.channel, Arc::new(transport)),
            Err(e) => {
                warn!("NATS unavailable, running as a single tab: {:#}", e);
                SyncChannel::detached(&cfg.chat.channel)
            }
        },
        None => SyncChannel::detached(&cfg.chat.channel),
    };

    let gateway = Arc::new(HttpTranslationGateway::new(
        &cfg.translation,
        cfg.chat.languages.clone(),
    )?);

    let source = cfg
        .recording
        .source
        .clone()
        .map(AudioSource::File)
        .unwrap_or(AudioSource::None);
    let device: Arc<dyn CaptureDevice> = Arc::from(CaptureDeviceFactory::create(
        source,
        cfg.recording.buffer_duration_ms,
    ));
    info!("Capture device: {}", device.name());
    let recorder = RecordingSession::new(cfg.recording.clone(), device);

    let controller = Arc::new(
        ChatController::open(role, channel, gateway, recorder, Arc::new(TimedPlayer::new())).await,
    );

    let app = create_router(AppState::new(Arc::clone(&controller)));
    let addr = format!(
        "{}:{}",
        cfg.service.http.bind,
        cli.port.unwrap_or(cfg.service.http.port)
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Chat view for role {} listening on {}", role, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    controller.close().await;
    info!("Chat view closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
    }
}
