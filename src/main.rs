//! SariCoach - Store Coach Assistant
//!
//! Ask the store coach questions from the terminal and hear the answers.

use sari_coach::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run().await
}
