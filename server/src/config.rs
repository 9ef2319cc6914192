use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Shared secret required by the scheduled HTTP trigger
    pub cron_secret: String,
    /// OpenAI-compatible endpoint used for digest summaries
    pub summary_api_url: String,
    pub summary_api_key: Option<String>,
    pub summary_model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID must be set")?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET must be set")?,
            cron_secret: env::var("CRON_SECRET").context("CRON_SECRET must be set")?,
            summary_api_url: env::var("SUMMARY_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            summary_api_key: env::var("SUMMARY_API_KEY").ok(),
            summary_model: env::var("SUMMARY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        })
    }
}
