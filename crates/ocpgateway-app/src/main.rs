use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ocpgateway::store::{MemoryStore, Seed};
use ocpgateway::{Config, Engine};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
	Text,
	Json,
}

#[derive(Debug, Parser)]
#[command(name = "ocpgateway", version, about = "Dynamic tool invocation gateway")]
struct Args {
	/// Path to a YAML configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Override the listen address
	#[arg(short, long)]
	bind: Option<SocketAddr>,

	/// Seed file with authenticators, services and catalogs (JSON or YAML)
	#[arg(long)]
	seed: Option<PathBuf>,

	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(args.log_format)?;

	let mut config = match &args.config {
		Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => Config::default(),
	};
	if let Some(bind) = args.bind {
		config.bind = bind;
	}
	if let Some(seed) = args.seed {
		config.seed = Some(seed);
	}

	let store = Arc::new(MemoryStore::new());
	if let Some(path) = &config.seed {
		Seed::load(path)
			.await?
			.apply(store.as_ref())
			.await
			.context("applying seed")?;
	}

	let engine = Arc::new(Engine::new(store, &config)?);
	let listener = TcpListener::bind(config.bind)
		.await
		.with_context(|| format!("binding {}", config.bind))?;
	info!(target: "api", bind = %config.bind, base_path = %config.base_path, "starting ocpgateway");
	ocpgateway::api::serve(listener, engine, &config.base_path).await?;
	Ok(())
}

fn init_tracing(format: LogFormat) -> Result<()> {
	let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
	let registry = tracing_subscriber::registry().with(filter);
	match format {
		LogFormat::Text => registry.with(fmt::layer()).init(),
		LogFormat::Json => registry.with(fmt::layer().json()).init(),
	}
	Ok(())
}
