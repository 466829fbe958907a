use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use actionhost::proxy::ActionProxy;
use actionhost::server::router;
use actionhost::wasm::WasmRuntime;

#[derive(Parser)]
#[command(name = "actionhost", about = "Single-action execution host.")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("actionhost=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let runtime = WasmRuntime::new().context("wasm engine creation failed")?;
    let proxy = Arc::new(ActionProxy::new(Box::new(runtime)));

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("actionhost listening on {addr}");

    axum::serve(listener, router(proxy)).await?;
    Ok(())
}
