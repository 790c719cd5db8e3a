use anyhow::{Context, Result};
use products_crm::notify::DEFAULT_CAPACITY;

const DEFAULT_ORIGIN: &str = "http://localhost:5173";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub cors_allowed_origins: Vec<String>,
    /// Buffer of the lead-change broadcast bus.
    pub notify_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: vec![DEFAULT_ORIGIN.to_string()],
            notify_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ORIGIN.into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let notify_capacity = match lookup("NOTIFY_CHANNEL_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid NOTIFY_CHANNEL_CAPACITY: {raw}"))?
                .max(1),
            None => DEFAULT_CAPACITY,
        };

        Ok(Self {
            cors_allowed_origins,
            notify_capacity,
        })
    }
}
