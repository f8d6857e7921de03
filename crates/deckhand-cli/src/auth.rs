use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Bearer token stored for one profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub server: String,
    pub token: String,
}

fn creds_path(profile: &str) -> Result<PathBuf> {
    Ok(crate::config::config_dir()?.join(format!("credentials.{profile}.json")))
}

pub fn load_credentials(profile: &str) -> Result<Option<StoredCredentials>> {
    let path = creds_path(profile)?;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let creds: StoredCredentials = serde_json::from_str(&content)
        .with_context(|| format!("Invalid credentials file {}", path.display()))?;
    Ok(Some(creds))
}

pub fn save_credentials(profile: &str, creds: &StoredCredentials) -> Result<()> {
    let path = creds_path(profile)?;
    let content = serde_json::to_string_pretty(creds)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn remove_credentials(profile: &str) -> Result<bool> {
    let path = creds_path(profile)?;
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub fn resolve_token(cli_token: &Option<String>, profile: &str) -> Result<String> {
    // 1. --token flag / DECKHAND_TOKEN env
    if let Some(t) = cli_token {
        return Ok(t.clone());
    }
    // 2. Stored credentials for this profile
    if let Some(creds) = load_credentials(profile)? {
        return Ok(creds.token);
    }
    anyhow::bail!(
        "No API token available. Use --token, set DECKHAND_TOKEN env var, or run: deckhand login --token <token>"
    )
}
