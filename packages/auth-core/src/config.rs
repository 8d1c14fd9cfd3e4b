use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::models::CountryCode;

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub firebase_api_key: String,
    pub firebase_project_id: String,
    /// Fixed dialing prefix applied to every 10-digit local number.
    pub country_code: CountryCode,
    /// Pre-obtained human-verification token for headless environments.
    pub recaptcha_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .context("FIREBASE_API_KEY must be set")?,
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .context("FIREBASE_PROJECT_ID must be set")?,
            country_code: match env::var("PHONE_COUNTRY_CODE") {
                Ok(raw) => CountryCode::parse(&raw)
                    .context("PHONE_COUNTRY_CODE must be '+' followed by 1-3 digits")?,
                Err(_) => CountryCode::default(),
            },
            recaptcha_token: env::var("FIREBASE_RECAPTCHA_TOKEN").ok(),
        })
    }
}
