use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use driftwatch::api::{self, middleware::SecurityConfig};
use driftwatch::config::MonitorConfig;
use driftwatch::db;
use driftwatch::jobs::{HeartbeatJob, MonitorJob};
use driftwatch::registry::{find_project, ProjectTemplate};
use driftwatch::scheduler::Scheduler;

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(about = "Scheduled data-drift monitoring")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the heartbeat and monitoring jobs on their schedules (default)
    Run,
    /// Run the monitoring job once
    Monitor {
        /// Current window to analyse instead of the minute-based index
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Append one heartbeat line
    Heartbeat,
    /// List projects in the workspace
    Projects,
    /// List snapshots of the named project
    Snapshots {
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Serve the local workspace over HTTP
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "driftwatch=info,tower_http=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = MonitorConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let store = blocking({
                let config = config.clone();
                move || config.open_store()
            })
            .await?;
            let monitor = MonitorJob::new(store, config.dataset_source(), &config);
            let heartbeat = HeartbeatJob::new(config.schedule.heartbeat_log.clone());

            tracing::info!("Starting scheduler for project '{}'", config.project_name);
            Scheduler::new()
                .every(Duration::from_secs(config.schedule.heartbeat_secs), heartbeat)
                .every(Duration::from_secs(config.schedule.monitor_secs), monitor)
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await;
        }
        Commands::Monitor { index } => {
            let outcome = blocking(move || {
                let store = config.open_store()?;
                let job = MonitorJob::new(store, config.dataset_source(), &config);
                match index {
                    Some(i) => job.run_with_index(i),
                    None => job.run_at(chrono::Utc::now()),
                }
            })
            .await?;
            println!(
                "Attached report {} and test suite {} to project {} (window {}, {} rows)",
                outcome.report_id,
                outcome.suite_id,
                outcome.project_id,
                outcome.cycle_index,
                outcome.current_rows
            );
        }
        Commands::Heartbeat => {
            let job = HeartbeatJob::new(config.schedule.heartbeat_log.clone());
            blocking(move || job.beat_at(chrono::Utc::now())).await?;
        }
        Commands::Projects => {
            let projects = blocking(move || config.open_store()?.list_projects()).await?;
            for project in projects {
                println!("{}  {}", project.id, project.name);
            }
        }
        Commands::Snapshots { project } => {
            let snapshots = blocking(move || {
                let store = config.open_store()?;
                let name = project.unwrap_or_else(|| ProjectTemplate::from_config(&config).name);
                let project = find_project(store.as_ref(), &name)?
                    .with_context(|| format!("No project named '{}'", name))?;
                store.list_snapshots(project.id)
            })
            .await?;
            for snapshot in snapshots {
                println!(
                    "{}  {}  {}",
                    snapshot.timestamp.to_rfc3339(),
                    snapshot.kind().as_str(),
                    snapshot.id
                );
            }
        }
        Commands::Serve { port } => {
            let db = match &config.workspace {
                Some(path) => db::Database::open(path.clone())?,
                None => db::Database::open_default()?,
            };
            db.migrate()?;

            let app = api::create_router_with_security(db, SecurityConfig::from_env());

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Workspace API listening on http://127.0.0.1:{}/api/v1", port);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Run blocking store/dataset work off the async executor.
async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
