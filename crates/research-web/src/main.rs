//! Research assistant web server

use clap::Parser;
use research_runtime::ResearchRuntime;
use research_utils::AppConfig;
use research_web::{AppState, router};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "research-web")]
#[command(about = "Multi-agent research assistant served over HTTP", long_about = None)]
struct Args {
    /// Address to bind (overrides RESEARCH_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides RESEARCH_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Idle sessions are dropped after this many seconds
    #[arg(long, default_value_t = 3600)]
    session_ttl: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    research_utils::init_tracing();
    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if args.host.is_some() || args.port.is_some() {
        let host = args.host.unwrap_or_else(|| config.server.host.clone());
        let port = args.port.unwrap_or(config.server.port);
        config = config.with_server(host, port);
    }

    let runtime = Arc::new(ResearchRuntime::from_config(&config)?);
    let state = Arc::new(AppState::new(runtime).with_session_ttl(args.session_ttl));

    let sweeper = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(300));
        loop {
            ticker.tick().await;
            let removed = sweeper.sessions.cleanup_expired();
            if removed > 0 {
                info!(removed, "Expired sessions dropped");
            }
        }
    });

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        %address,
        model = %config.llm.model,
        max_search_rounds = config.limits.max_search_rounds,
        "Research assistant listening"
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
