//! Client and reconciliation settings.
//!
//! Both structs are built once per process and validated at construction.
//! Nothing in here knows where the values came from: flags, env vars and
//! profile files are the caller's business.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::endpoints::EndpointTable;
use crate::error::{Error, Result};
use crate::types::EnvFlags;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where to reach the platform and how to authenticate.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::configuration(format!("invalid base URL \"{base_url}\": {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::configuration(format!(
                "base URL must be http or https, got \"{}\"",
                base_url.scheme()
            )));
        }
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::configuration("API token is empty"));
        }
        Ok(Self {
            base_url,
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &mask_token(&self.token))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Short, non-reversible preview of a secret for display.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 20 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "********".to_string()
    }
}

/// Knobs for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Keys owned by the deployment infrastructure; never written by a sync.
    pub reserved_keys: BTreeSet<String>,
    /// Flags applied to variables a sync creates or updates.
    pub env_flags: EnvFlags,
    pub poll_interval: Duration,
    pub endpoints: EndpointTable,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            reserved_keys: BTreeSet::new(),
            env_flags: EnvFlags::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            endpoints: EndpointTable::default(),
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::configuration("poll interval must be greater than zero"));
        }
        self.endpoints.validate()
    }

    pub fn with_reserved_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        self.reserved_keys.contains(key)
    }
}
