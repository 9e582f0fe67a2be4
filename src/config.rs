use std::env;
use anyhow::{bail, Context, Result};

const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_EMAIL_FROM: &str = "Property Inspection <noreply@yourdomain.com>";

#[derive(Debug, Clone)]
pub struct Config {
    pub service_port: u16,
    pub service_host: String,
    pub store: StoreConfig,
    pub email: EmailConfig,
}

/// Which key-value backend holds bookings, settings and the order counter
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Spanner(SpannerConfig),
    /// Process-local map; contents are lost on restart
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub api_url: String,
    pub from: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("from", &self.from)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).with_context(|| format!("{} environment variable is required", name))
        };

        let service_port = lookup("SERVICE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = lookup("SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "spanner".to_string());
        let store = match backend.as_str() {
            "spanner" => StoreConfig::Spanner(SpannerConfig {
                emulator_host: lookup("SPANNER_EMULATOR_HOST"),
                project: required("SPANNER_PROJECT")?,
                instance: required("SPANNER_INSTANCE")?,
                database: required("SPANNER_DATABASE")?,
            }),
            "memory" => StoreConfig::Memory,
            other => bail!("STORE_BACKEND must be 'spanner' or 'memory', got '{}'", other),
        };

        let email = EmailConfig {
            api_key: required("RESEND_API_KEY")?,
            api_url: lookup("RESEND_API_URL").unwrap_or_else(|| DEFAULT_RESEND_API_URL.to_string()),
            from: lookup("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
        };

        Ok(Config {
            service_port,
            service_host,
            store,
            email,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.store {
            StoreConfig::Spanner(spanner) => {
                tracing::info!("  Store backend: spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner database: {}", spanner.database_path());
            }
            StoreConfig::Memory => tracing::info!("  Store backend: memory"),
        }
        tracing::info!("  Email API: {}", self.email.api_url);
        tracing::info!("  Email sender: {}", self.email.from);
        tracing::info!("  Email API key: {}",
            if self.email.api_key.is_empty() { "empty" } else { "set" });
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}
