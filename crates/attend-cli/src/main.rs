use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod enroll;
mod scan;

use config::Config;

#[derive(Parser)]
#[command(name = "attend", about = "Practicum attendance face scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run live face recognition for a class session
    Scan {
        /// Backend id of the practicum session
        #[arg(short, long)]
        session_id: i64,
    },
    /// Register your face from camera captures
    Enroll,
    /// Show a user's face registration status
    Status {
        #[arg(short, long)]
        user_id: i64,
    },
    /// Delete a user's face data (re-registration is the only way back)
    DeleteFace {
        #[arg(short, long)]
        user_id: i64,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List available cameras
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Scan { session_id } => scan::run(&config, session_id).await?,
        Commands::Enroll => enroll::run(&config).await?,
        Commands::Status { user_id } => {
            let client = attend_backend::ApiClient::new(&config.api_base_url, &config.api_token);
            let status = client.get_face_status(user_id).await?;
            if status.registered {
                println!(
                    "user {user_id}: registered, {} samples, trained at {}",
                    status.sample_count,
                    status
                        .trained_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "unknown".to_string())
                );
            } else {
                println!("user {user_id}: no face data registered");
            }
        }
        Commands::DeleteFace { user_id, yes } => {
            if !yes {
                println!("refusing to delete face data for user {user_id} without --yes");
                return Ok(());
            }
            let client = attend_backend::ApiClient::new(&config.api_base_url, &config.api_token);
            client.delete_face_data(user_id).await?;
            println!("face data for user {user_id} deleted");
        }
        Commands::Devices => {
            let devices = attend_capture::CameraSource::list_devices();
            if devices.is_empty() {
                println!("no capture devices found");
            }
            for d in devices {
                println!("{}\t{} ({})", d.path, d.name, d.driver);
            }
        }
    }

    Ok(())
}
