use clap::{Parser, Subcommand};

use server::config::AppConfig;
use server::digest::send_daily_digest;
use server::sync::service::catch_up_fleet;

#[derive(Parser)]
#[command(name = "catchup-cli")]
#[command(about = "Run the mailbox catch-up and digest jobs from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Catch up change history for all eligible mailboxes
    ///
    /// Prints the aggregated per-account results as JSON. Individual
    /// account failures are recorded in the output and do not change the
    /// exit code.
    CatchUp {
        /// Limit the run to one mailbox address
        email: Option<String>,

        /// Also compile and send the daily digest for the filtered mailbox
        #[arg(long)]
        send_digest: bool,
    },

    /// Compile and send the daily digest for one mailbox
    Digest {
        email: String,

        /// Inbox window in hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the JSON result stays parseable on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let pool = server::db::establish_connection_pool(&config.database_url)?;

    match cli.command {
        Commands::CatchUp { email, send_digest } => {
            let result = catch_up_fleet(&pool, &config, email.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if send_digest {
                if let Some(email) = &email {
                    tracing::info!(email = %email, "Sending daily digest");
                    send_daily_digest(&pool, &config, email, 24).await?;
                }
            }
        }
        Commands::Digest { email, hours } => {
            send_daily_digest(&pool, &config, &email, hours).await?;
        }
    }

    Ok(())
}
