use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_gateway::api::{self, AppState};
use llm_gateway::config::{Args, RuntimeOptions};
use llm_gateway::engine::Engine;
use llm_gateway::loader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "llm_gateway=info,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // The engine variant is decided exactly once, here. A load failure is a
    // degraded start, not a refusal to start.
    let engine = match &args.model_path {
        Some(path) => match loader::load(path, &RuntimeOptions::from(&args)) {
            Ok(runtime) => {
                info!("model loaded successfully");
                Engine::loaded(runtime)
            }
            Err(e) => {
                error!("failed to load model: {e}; starting in mock mode");
                Engine::Mock
            }
        },
        None => {
            info!("no model path provided; starting in mock mode");
            Engine::Mock
        }
    };

    let state = Arc::new(AppState { engine });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::new(args.host.parse()?, args.port);

    println!(
        r#"
🚀 Gateway starting...
   ├─ Address: http://{}
   └─ Endpoints:
      ├─ GET  /health              - Health check
      └─ POST /v1/chat/completions - Chat completion (OpenAI compatible)

Press Ctrl+C to stop the server.
"#,
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
