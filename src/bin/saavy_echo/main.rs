//! saavy-echo - live microphone echo
//!
//! Run with: cargo run --bin saavy-echo
//! Logs go to stderr; set RUST_LOG=saavy_echo=debug for graph rebuild traces.

mod app;
mod controls;

use saavy_echo::session::EchoConfig;
use tracing_subscriber::EnvFilter;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut session = app::open_session(EchoConfig::default())?;
    controls::run(&mut session)
}
