//! Explicit credentials for private sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// A credential passed to every call that reaches the network
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// Git host credentials (`github.com`, `gitlab.example.com`)
    GitSource {
        host: String,
        username: String,
        password: String,
    },
    /// Private Composer repository credentials
    PackageRegistry {
        registry: String,
        username: String,
        password: String,
    },
}

impl Credential {
    /// Host or registry string this credential applies to
    pub fn host(&self) -> &str {
        match self {
            Credential::GitSource { host, .. } => host,
            Credential::PackageRegistry { registry, .. } => registry,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Credential::GitSource { username, .. } | Credential::PackageRegistry { username, .. } => {
                username
            }
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Credential::GitSource { password, .. } | Credential::PackageRegistry { password, .. } => {
                password
            }
        }
    }

    /// Returns true if `url_or_host` contains this credential's host
    pub fn matches_host(&self, url_or_host: &str) -> bool {
        !self.host().is_empty() && url_or_host.contains(self.host())
    }
}

/// Find the first credential applying to `url_or_host`
pub fn credential_for<'a>(credentials: &'a [Credential], url_or_host: &str) -> Option<&'a Credential> {
    credentials.iter().find(|c| c.matches_host(url_or_host))
}

// Passwords never end up in logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::GitSource { host, username, .. } => f
                .debug_struct("GitSource")
                .field("host", host)
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::PackageRegistry {
                registry, username, ..
            } => f
                .debug_struct("PackageRegistry")
                .field("registry", registry)
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}
