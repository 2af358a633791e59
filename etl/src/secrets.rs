use std::fmt;

use common::config::Settings;
use common::{Error, Result};
use tracing::info;

/// Settings paths reported when a credential is missing, matching how the
/// values are addressed from the environment (SOURCES__EVOCON__API_KEY).
pub const API_KEY_PATH: &str = "sources.evocon.api_key";
pub const SECRET_PATH: &str = "sources.evocon.secret";

/// Evocon API credentials, held only for the lifetime of a run.
#[derive(Clone)]
pub struct EvoconCredentials {
    pub api_key: String,
    pub secret: String,
}

// Keeps raw secrets out of {:?} output and panic messages.
impl fmt::Debug for EvoconCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvoconCredentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret", &redact(&self.secret))
            .finish()
    }
}

/// Read both Evocon secrets from settings, halting the run before any network
/// client is built when either is absent. Logs a redacted preview so operators
/// can confirm which key pair a run picked up.
pub fn resolve_credentials(settings: &Settings) -> Result<EvoconCredentials> {
    let api_key = settings.sources.evocon.api_key.trim();
    let secret = settings.sources.evocon.secret.trim();

    if api_key.is_empty() {
        return Err(Error::MissingCredentials(API_KEY_PATH.to_string()));
    }
    if secret.is_empty() {
        return Err(Error::MissingCredentials(SECRET_PATH.to_string()));
    }

    info!("API Key: {}", redact(api_key));
    info!("API Secret: {}", redact(secret));

    Ok(EvoconCredentials {
        api_key: api_key.to_string(),
        secret: secret.to_string(),
    })
}

/// First and last five characters with the middle elided. Values too short to
/// keep any middle hidden are masked outright.
pub fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 10 {
        return "*****".to_string();
    }

    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}
