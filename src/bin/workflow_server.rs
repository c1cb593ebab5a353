//! Workflow server binary.
//!
//! Configuration comes from the environment (and `$WORKFLOW_CONFIG`, if set).
//! Log filtering follows `RUST_LOG`.

use anyhow::Context;
use chat_workflows::config::Settings;
use chat_workflows::server::{self, AppState};
use chat_workflows::workflow::{Backends, Workflows};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_workflows=info,tower_http=info".into()),
        )
        .init();

    let settings = Settings::load().context("loading settings")?;
    tracing::info!(
        bind = %settings.bind_address(),
        llm = %settings.llm.base_url,
        images = %settings.image.base_url,
        "starting workflow server"
    );

    let backends = Backends::from_settings(&settings).context("creating backends")?;
    let workflows = Workflows::build(&settings, backends).context("building workflows")?;

    server::serve(&settings, AppState::new(workflows))
        .await
        .context("running server")?;
    Ok(())
}
