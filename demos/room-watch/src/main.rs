use clap::{Parser, ValueEnum};
use partyline::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Lobby,
    Game,
}

impl From<Kind> for ConnectionKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Lobby => ConnectionKind::Lobby,
            Kind::Game => ConnectionKind::Game,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "room-watch")]
#[command(about = "Join a party-game room and log every state change")]
struct Args {
    #[arg(long, default_value = "http://localhost:8000", help = "Origin the app is served from")]
    origin: String,

    #[arg(help = "Room id to join")]
    room: String,

    #[arg(long, value_enum, default_value_t = Kind::Lobby)]
    kind: Kind,

    #[arg(long, help = "Bearer token (falls back to PARTYLINE_TOKEN)")]
    token: Option<String>,

    #[arg(long, help = "Use /ws/<kind>/<room> instead of /ws/<room>")]
    kind_in_path: bool,
}

impl Args {
    fn endpoint(&self) -> Result<Endpoint, ClientError> {
        let endpoint = Endpoint::from_origin(&self.origin)?;
        Ok(if self.kind_in_path {
            endpoint.with_kind_in_path()
        } else {
            endpoint
        })
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let token = args.token.clone();
    let tokens =
        move || token.clone().or_else(|| std::env::var("PARTYLINE_TOKEN").ok());

    let client = SessionClient::builder()
        .navigator(|route: &Route| tracing::info!(%route, "navigate"))
        .build(WebSocketDialer::new(), args.endpoint()?, tokens);

    let _sub = client.subscribe(|view| {
        tracing::info!(
            phase = %view.phase,
            room_phase = %view.snapshot.phase(),
            players = view.snapshot.players.len(),
            error = ?view.error,
            "session"
        );
    });
    client.set_message_handler(|event| {
        tracing::debug!(kind = event.kind(), "event");
    })?;

    if let Err(e) = client.connect(args.room.as_str(), args.kind.into()).await {
        tracing::warn!(error = %e, "initial connect failed");
    }

    tokio::signal::ctrl_c().await?;
    client.disconnect().await?;
    client.dispose().await;
    Ok(())
}
