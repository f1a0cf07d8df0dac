use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trailstitch::{AppState, config::ServerConfig, create_router, store::TrailStore};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Serve routes stitched together from a directory of GPX trails"
)]
struct Args {
    #[command(flatten)]
    server: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trailstitch=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Args { server } = Args::parse();
    let store = TrailStore::open(&server.data_dir)?;
    tracing::info!(
        "serving {} trail(s) from {}",
        store.trail_files()?.len(),
        store.dir().display()
    );

    let state = AppState {
        store: Arc::new(store),
        assembly: server.assembly,
    };
    let app = create_router(state);

    tracing::info!("starting backend on http://{}", server.bind);
    let listener = tokio::net::TcpListener::bind(server.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
