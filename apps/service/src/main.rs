use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use uuid::Uuid;

use logger::{LevelFilter, LogFormat};
use uppe_monitor::database::models::Incident;
use uppe_monitor::database::{IncidentStore, JobStore, LibsqlStore, MetricsStore};
use uppe_monitor::{Config, ExecutionEngine, fixtures};

#[derive(Debug, Parser)]
#[command(name = "uppe-monitor", version, about = "Run uptime monitoring jobs and inspect incidents")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/uppe/monitor.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute jobs once and print their metrics
    Run {
        #[arg(required = true)]
        job_ids: Vec<Uuid>,
    },
    /// Create the demonstration jobs
    Seed,
    /// List incidents
    Incidents {
        /// Only incidents that are still open
        #[arg(long)]
        active: bool,
        /// Only incidents affecting this component
        #[arg(long, value_name = "ID")]
        component: Option<String>,
    },
    /// List the most recent metrics of a job
    Metrics {
        job_id: Uuid,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init_with(LogFormat::from_env(), LevelFilter::INFO);

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_ref()).context("loading configuration")?;
    tracing::info!("{}", config);

    let store = Arc::new(
        LibsqlStore::open(&config.database.path, config.database.max_connections)
            .await
            .with_context(|| format!("opening database {}", config.database.path))?,
    );

    match cli.command {
        Commands::Run { job_ids } => run_jobs(&config, store, job_ids).await,
        Commands::Seed => {
            for job in fixtures::bootstrap_fixtures(store.as_ref()).await? {
                println!("{}  {}  {}", job.id, job.job_type, job.name);
            }
            Ok(())
        }
        Commands::Incidents { active, component } => {
            let incidents = match (active, component) {
                (_, Some(component)) => {
                    let mut found = store.find_by_component(&component).await?;
                    if active {
                        found.retain(Incident::is_open);
                    }
                    found
                }
                (true, None) => store.find_active().await?,
                (false, None) => {
                    let mut all = Vec::new();
                    for job in store.list_jobs().await? {
                        all.extend(store.find_by_job(job.id).await?);
                    }
                    all
                }
            };
            for incident in incidents {
                print_incident(&incident);
            }
            Ok(())
        }
        Commands::Metrics { job_id, limit } => {
            for metric in store.recent_for_job(job_id, limit).await? {
                println!("{metric}");
            }
            Ok(())
        }
    }
}

async fn run_jobs(config: &Config, store: Arc<LibsqlStore>, job_ids: Vec<Uuid>) -> Result<()> {
    let engine = ExecutionEngine::from_config(config, store.clone(), store.clone())?;

    let runs = job_ids.iter().map(|id| engine.execute_by_id(store.as_ref(), *id));
    let mut failed = 0;

    for (id, result) in job_ids.iter().zip(join_all(runs).await) {
        match result {
            Ok(Some(metric)) => println!("{metric}"),
            Ok(None) => println!("{id}: job type has no probe, skipped"),
            Err(e) => {
                failed += 1;
                tracing::error!("Execution of job {} failed: {}", id, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} executions failed", job_ids.len());
    }
    Ok(())
}

fn print_incident(incident: &Incident) {
    let end = incident.date_end.map(|end| end.to_rfc3339()).unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {}  {}  {} -> {}  {}",
        incident.id,
        incident.status,
        incident.job_id,
        incident.date_start.to_rfc3339(),
        end,
        incident.description
    );
}
