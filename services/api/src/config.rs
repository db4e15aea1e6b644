use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub llm_api_key: String,
    pub llm_api_base: String,
    pub chat_model: String,
    pub log_level: Level,
    pub knowledge_path: PathBuf,
    pub top_k: usize,
    pub callback_max_wait: Duration,
    pub callback_poll_interval: Duration,
    pub host_name: Option<String>,
    pub availability_webhook: Option<String>,
    pub booking_webhook: Option<String>,
    pub email_webhook: Option<String>,
    pub schedule_date: String,
    pub utc_offset_hours: i64,
    pub voice_api_key: Option<String>,
    pub voice_register_url: Option<String>,
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: String) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var::<SocketAddr>(
            "BIND_ADDRESS",
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        )?;

        let llm_api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ConfigError::MissingVar("LLM_API_KEY".to_string()))?;
        let llm_api_base = std::env::var("LLM_API_BASE")
            .unwrap_or_else(|_| "https://api.mistral.ai/v1".to_string());
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "mistral-large-latest".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let knowledge_path = std::env::var("KNOWLEDGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./knowledge.md"));
        let top_k = parse_var::<usize>(
            "TOP_K",
            std::env::var("TOP_K").unwrap_or_else(|_| "2".to_string()),
        )?;

        let callback_max_wait = Duration::from_secs(parse_var::<u64>(
            "CALLBACK_MAX_WAIT_SECS",
            std::env::var("CALLBACK_MAX_WAIT_SECS").unwrap_or_else(|_| "15".to_string()),
        )?);
        let callback_poll_interval = Duration::from_millis(parse_var::<u64>(
            "CALLBACK_POLL_INTERVAL_MS",
            std::env::var("CALLBACK_POLL_INTERVAL_MS").unwrap_or_else(|_| "100".to_string()),
        )?);

        let host_name = std::env::var("HOST_NAME").ok();
        let availability_webhook = std::env::var("AVAILABILITY_WEBHOOK").ok();
        let booking_webhook = std::env::var("BOOKING_WEBHOOK").ok();
        let email_webhook = std::env::var("EMAIL_WEBHOOK").ok();

        // The scheduling webhooks only make sense as a set; a partial
        // configuration is almost certainly a deployment mistake.
        let any_webhook =
            host_name.is_some() || availability_webhook.is_some() || booking_webhook.is_some();
        let all_webhooks =
            host_name.is_some() && availability_webhook.is_some() && booking_webhook.is_some();
        if any_webhook && !all_webhooks {
            return Err(ConfigError::MissingVar(
                "HOST_NAME, AVAILABILITY_WEBHOOK and BOOKING_WEBHOOK must be set together"
                    .to_string(),
            ));
        }

        let schedule_date =
            std::env::var("SCHEDULE_DATE").unwrap_or_else(|_| "2024-04-27".to_string());
        let utc_offset_hours = parse_var::<i64>(
            "UTC_OFFSET_HOURS",
            std::env::var("UTC_OFFSET_HOURS").unwrap_or_else(|_| "2".to_string()),
        )?;

        let voice_api_key = std::env::var("VOICE_API_KEY").ok();
        let voice_register_url = std::env::var("VOICE_REGISTER_URL").ok();

        Ok(Self {
            bind_address,
            llm_api_key,
            llm_api_base,
            chat_model,
            log_level,
            knowledge_path,
            top_k,
            callback_max_wait,
            callback_poll_interval,
            host_name,
            availability_webhook,
            booking_webhook,
            email_webhook,
            schedule_date,
            utc_offset_hours,
            voice_api_key,
            voice_register_url,
        })
    }

    /// The live scheduling integration, when fully configured.
    pub fn webhook_config(&self) -> Option<frontdesk_core::executor::WebhookConfig> {
        match (
            &self.host_name,
            &self.availability_webhook,
            &self.booking_webhook,
        ) {
            (Some(host_name), Some(availability_url), Some(booking_url)) => {
                Some(frontdesk_core::executor::WebhookConfig {
                    host_name: host_name.clone(),
                    availability_url: availability_url.clone(),
                    booking_url: booking_url.clone(),
                    email_url: self.email_webhook.clone(),
                    schedule_date: self.schedule_date.clone(),
                    utc_offset_hours: self.utc_offset_hours,
                })
            }
            _ => None,
        }
    }
}
