//! `copilotd` — the daemon binary. Loads configuration, bootstraps the
//! DSQL-backed stores, wires the Observation Loop / Log Watcher /
//! Scheduled Assessment as the three fixed-logical-id long-running
//! tasks, and serves the Read API. Grounded in the teacher's
//! `bin/fleet_hub.rs` top-level shape (clap args, tracing init, pool,
//! spawned background tasks, `axum::serve` with graceful shutdown).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use copilot::api::{create_app, ApiState};
use copilot::assessment::{
    AssessmentPipeline, LlmDeepNarrator, LlmTriageNarrator, NoOpDeepNarrator, NoOpKnowledgeBase,
    NoOpTriageNarrator,
};
use copilot::config::CopilotConfig;
use copilot::config_compiler::{
    modifiers::build_default_modifiers, presets::build_default_presets, registry::build_default_registry,
    ConfigCompiler,
};
use copilot::fetch::{HttpKnowledgeBase, LokiLogSource, NoOpLogSource, PrometheusSignalSource};
use copilot::health::HealthThresholds;
use copilot::observation::{
    start_or_adopt, LogWatcher, ObservationLoop, ScheduledAssessment, LOG_WATCHER_LOGICAL_ID,
    OBSERVATION_LOOP_LOGICAL_ID, SCHEDULED_ASSESSMENT_LOGICAL_ID,
};
use copilot::store::{
    create_pool, run_migrations, PgAssessmentRecordStore, PgAssessmentStore, PgBehaviourProfileStore,
    PgWorkflowLeaseStore,
};

#[derive(Parser, Debug)]
#[command(name = "copilotd", about = "SRE Copilot daemon")]
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
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,copilot=debug")),
        )
        .init();

    let args = CliArgs::parse();
    if let Some(path) = &args.config {
        std::env::set_var("COPILOT_CONFIG", path);
    }

    let config = CopilotConfig::load();
    info!(cluster_id = %config.cluster.cluster_id, "starting copilotd");

    let pool = create_pool(&config.database.url, config.database.max_connections).await?;
    run_migrations(&pool).await?;

    let assessment_store: Arc<dyn copilot::assessment::AssessmentStore> =
        Arc::new(PgAssessmentStore::new(pool.clone()));
    let record_store: Arc<dyn copilot::observation::traits::AssessmentRecordStore> =
        Arc::new(PgAssessmentRecordStore::new(pool.clone()));
    let lease_store: Arc<dyn copilot::observation::traits::WorkflowLeaseStore> =
        Arc::new(PgWorkflowLeaseStore::new(pool.clone()));
    let profile_store: Arc<dyn copilot::profiles::BehaviourProfileStore> =
        Arc::new(PgBehaviourProfileStore::new(pool.clone()));

    let signal_source: Arc<dyn copilot::observation::traits::SignalSource> =
        Arc::new(PrometheusSignalSource::new(config.signal_source.prometheus_endpoint.as_str()));

    let log_source: Arc<dyn copilot::observation::traits::LogSource> = match &config.log_source.endpoint {
        Some(endpoint) => Arc::new(LokiLogSource::new(endpoint.clone())),
        None => Arc::new(NoOpLogSource),
    };

    let knowledge_base: Arc<dyn copilot::assessment::KnowledgeBaseClient> = match &config.knowledge_base.endpoint {
        Some(endpoint) => Arc::new(HttpKnowledgeBase::new(endpoint.clone())),
        None => Arc::new(NoOpKnowledgeBase),
    };

    let (triage, deep): (
        Arc<dyn copilot::assessment::TriageNarrator>,
        Arc<dyn copilot::assessment::DeepNarrator>,
    ) = if config.narrator.enabled {
        match (&config.narrator.triage_model_path, &config.narrator.deep_model_path) {
            (Some(triage_path), Some(deep_path)) => (
                Arc::new(LlmTriageNarrator::load(triage_path).await?),
                Arc::new(LlmDeepNarrator::load(deep_path).await?),
            ),
            _ => {
                warn!("narrator.enabled is true but a model path is unset, falling back to triage-only summaries");
                (Arc::new(NoOpTriageNarrator), Arc::new(NoOpDeepNarrator))
            }
        }
    } else {
        (Arc::new(NoOpTriageNarrator), Arc::new(NoOpDeepNarrator))
    };

    let pipeline: Arc<dyn copilot::observation::traits::AssessmentRunner> = Arc::new(AssessmentPipeline::new(
        triage,
        deep,
        knowledge_base,
        log_source.clone(),
        assessment_store.clone(),
    ));

    let thresholds = HealthThresholds::default();
    let shutdown = CancellationToken::new();

    let mut tasks = Vec::new();

    let observation_loop = ObservationLoop::new(
        signal_source.clone(),
        record_store.clone(),
        pipeline.clone(),
        thresholds.clone(),
        Duration::from_secs(config.observation.interval_secs),
    );
    {
        let token = shutdown.clone();
        if let Some(handle) =
            start_or_adopt(lease_store.clone(), OBSERVATION_LOOP_LOGICAL_ID, move || observation_loop.run_until_cancelled(token))
                .await
        {
            tasks.push(handle);
        }
    }

    let log_watcher = LogWatcher::new(log_source, Duration::from_secs(config.observation.interval_secs));
    {
        let token = shutdown.clone();
        if let Some(handle) =
            start_or_adopt(lease_store.clone(), LOG_WATCHER_LOGICAL_ID, move || log_watcher.run_until_cancelled(token)).await
        {
            tasks.push(handle);
        }
    }

    let scheduled_assessment = ScheduledAssessment::new(
        signal_source,
        record_store,
        pipeline,
        thresholds,
        Duration::from_secs(config.observation.scheduled_assessment_interval_secs),
    );
    {
        let token = shutdown.clone();
        if let Some(handle) = start_or_adopt(lease_store, SCHEDULED_ASSESSMENT_LOGICAL_ID, move || {
            scheduled_assessment.run_until_cancelled(token)
        })
        .await
        {
            tasks.push(handle);
        }
    }

    let compiler = Arc::new(ConfigCompiler::new(
        build_default_registry(),
        build_default_presets(),
        build_default_modifiers(),
    ));

    let api_state = ApiState { assessments: assessment_store, profiles: profile_store, compiler };
    let app = create_app(api_state);
    let addr: SocketAddr = config.server.addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Read API listening");

    let serve_shutdown = shutdown.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
            info!("shutdown signal received");
            serve_shutdown.cancel();
        })
        .await?;

    for handle in tasks {
        handle.abort();
    }

    info!("copilotd shut down gracefully");
    Ok(())
}
