use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

mod auth;
mod config;
mod error;
mod logging;
mod models;
mod rest;
mod seed;

#[derive(Parser)]
#[command(about = "Environmental telemetry backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST server (default)
    Serve,
    /// Replace all stored readings with one month of synthetic data
    Seed {
        /// Month to seed as YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();

    let conn = models::establish_db_connection()
        .await
        .expect("Failed to open database");
    models::run_migrations(&conn)
        .await
        .expect("Failed to run migrations");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting server on port {}", config::CONFIG.server_port());
            rest::dispatch_server(conn).await;
        }
        Command::Seed { month } => {
            let (year, month) = parse_month(month.as_deref()).expect("Invalid --month, expected YYYY-MM");
            seed::generate(&conn, year, month)
                .await
                .expect("Failed to seed database");
        }
    }
}

fn parse_month(arg: Option<&str>) -> Option<(i32, u32)> {
    match arg {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d").ok()?;
            Some((date.year(), date.month()))
        }
        None => {
            let now = Utc::now();
            Some((now.year(), now.month()))
        }
    }
}
