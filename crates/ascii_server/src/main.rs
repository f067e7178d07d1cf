use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ascii_server::{router, ServerConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve ASCII art conversion over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "ASCII_SERVER_ADDR", default_value = "127.0.0.1:5000")]
    addr: SocketAddr,
    /// Directory uploaded files are stored in
    #[arg(long, env = "ASCII_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,
    /// Directory converted files are written to and served from
    #[arg(long, env = "ASCII_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,
    /// Directory listed by /fonts and searched for requested fonts
    #[arg(long, env = "ASCII_FONT_DIR", default_value = "fonts")]
    font_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = ServerConfig {
        upload_dir: args.upload_dir,
        output_dir: args.output_dir,
        font_dir: args.font_dir,
    };
    config.create_dirs().context("failed to create server directories")?;

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    info!("listening on http://{}", args.addr);

    axum::serve(listener, router(config)).await.context("server error")?;
    Ok(())
}
