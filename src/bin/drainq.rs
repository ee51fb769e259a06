//! drainq CLI: run the demo batch, or either half of it, against Redis.

use clap::{Parser, Subcommand};
use drainq::config::Config;
use drainq::model::Namespace;
use drainq::pool::{Pool, run_batch};
use drainq::producer::Producer;
use drainq::store::Connector;
use drainq::telemetry::init_tracing;
use secrecy::ExposeSecret;

#[derive(Parser)]
#[command(name = "drainq", about = "Redis-coordinated work pool demonstrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create work items and queue their identifiers
    Produce {
        /// Number of work items to create
        #[arg(long)]
        items: Option<u64>,
    },
    /// Drain the queue with a pool of workers
    Drain {
        /// Worker count (default: available parallelism minus one)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Produce and drain in one run
    Run {
        /// Number of work items to create
        #[arg(long)]
        items: Option<u64>,
        /// Worker count (default: available parallelism minus one)
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(&config.log_level)?;

    let connector = Connector::redis(config.redis_url.expose_secret());
    let namespace = Namespace::default();

    match cli.command {
        Command::Produce { items } => {
            let store = connector.connect().await?;
            let created = Producer::new(store, namespace)
                .item_duration_ms(config.item_duration_ms)
                .create_work(items.unwrap_or(config.work_items))
                .await?;
            println!("Created {created} work item(s).");
        }
        Command::Drain { workers } => {
            let mut pool = Pool::new(connector, namespace);
            if let Some(workers) = workers.or(config.workers) {
                pool = pool.workers(workers);
            }
            pool.run().await?;
            println!("Queue drained.");
        }
        Command::Run { items, workers } => {
            let created = run_batch(
                connector,
                namespace,
                items.unwrap_or(config.work_items),
                config.item_duration_ms,
                workers.or(config.workers),
            )
            .await?;
            println!("Batch of {created} work item(s) complete.");
        }
    }

    Ok(())
}
