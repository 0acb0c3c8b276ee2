use std::net::IpAddr;
use std::time::Duration;

use crate::error::GeneSeqError;

pub const EMAIL_VAR: &str = "NCBI_EMAIL";
pub const API_KEY_VAR: &str = "NCBI_API_KEY";

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DATASETS_BASE: &str = "https://api.ncbi.nlm.nih.gov/datasets/v2";

/// E-utilities allow 3 requests per second.
pub const DEFAULT_PACING: Duration = Duration::from_millis(340);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Operator email and API key sent with every NCBI request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, GeneSeqError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GeneSeqError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(GeneSeqError::MissingCredential(name))
        };
        Ok(Self {
            email: read(EMAIL_VAR)?,
            api_key: read(API_KEY_VAR)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcbiEndpoints {
    pub eutils_base: String,
    pub datasets_base: String,
}

impl NcbiEndpoints {
    /// Both bases point at this machine, so proxies must be bypassed.
    pub fn is_loopback(&self) -> bool {
        [&self.eutils_base, &self.datasets_base]
            .into_iter()
            .all(|base| is_loopback_url(base))
    }
}

fn is_loopback_url(base: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(base) else {
        return false;
    };
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

impl Default for NcbiEndpoints {
    fn default() -> Self {
        Self {
            eutils_base: EUTILS_BASE.to_string(),
            datasets_base: DATASETS_BASE.to_string(),
        }
    }
}
