//! `copilot-db` — schema bootstrap. Connects to the configured DSQL
//! endpoint and runs every pending migration, then exits. Grounded in
//! the teacher's `hub::db::run_migrations` invocation in `fleet_hub.rs`,
//! split out here into its own binary since a DSQL migration run is a
//! deploy-time step, not something `copilotd` should risk doing on every
//! restart under load.

use clap::Parser;
use tracing::info;

use copilot::config::CopilotConfig;
use copilot::store::{create_pool, run_migrations};

#[derive(Parser, Debug)]
#[command(name = "copilot-db", about = "Run pending DSQL schema migrations")]
struct CliArgs {
    /// Path to a `copilot.toml` config file. Overrides `COPILOT_CONFIG`.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    if let Some(path) = &args.config {
        std::env::set_var("COPILOT_CONFIG", path);
    }

    let config = CopilotConfig::load();
    info!(url = %config.database.url, "connecting to DSQL");

    let pool = create_pool(&config.database.url, config.database.max_connections).await?;
    run_migrations(&pool).await?;

    info!("migrations applied");
    Ok(())
}
