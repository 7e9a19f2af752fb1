//! Prepares the database file: creates or migrates the schema, and
//! optionally wipes it, promotes admins and loads the demo data.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use parcel_core::demo::{clear_demo_data, seed_demo_data};
use parcel_core::{Config, Database, Logistics, Notifier, Settings};
use parcel_types::Role;

#[derive(Debug, Parser)]
#[command(name = "parcel-bootstrap", about = "Create, migrate or seed the Parcel database")]
struct Args {
    /// Database file; defaults to DATABASE_PATH.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Delete the database file before opening it.
    #[arg(long)]
    reset: bool,

    /// Clear orders and load the demo users and order.
    #[arg(long)]
    seed: bool,

    /// Give these user ids the admin role.
    #[arg(long = "admin", value_name = "USER_ID")]
    admins: Vec<i64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let path = args.database.unwrap_or_else(|| config.database_path.clone());

    if args.reset && path.exists() {
        std::fs::remove_file(&path)?;
        for suffix in ["-wal", "-shm"] {
            let mut side = path.clone().into_os_string();
            side.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(side));
        }
        info!("Removed {}", path.display());
    }

    let db = Arc::new(Database::open(&path)?);
    let logistics = Logistics::new(db, Notifier::disabled(), Settings::from(&config));

    for user_id in args.admins {
        logistics.set_role(user_id, Role::Admin)?;
    }

    if args.seed {
        clear_demo_data(&logistics)?;
        let summary = seed_demo_data(&logistics)?;
        info!(
            "Seeded demo data: admin {}, manager {}, client {}, order {}",
            summary.admin_id, summary.manager_id, summary.client_id, summary.order_id
        );
    }

    info!("Database ready at {}", path.display());
    Ok(())
}
