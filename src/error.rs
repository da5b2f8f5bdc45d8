//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ParseError: Versions and constraints that cannot be understood
//! - CheckerError: Fatal outcomes of an update check
//! - ManifestError: Issues with composer.json / composer.lock
//! - RegistryError: Issues with package registry communication
//! - ConfigError: Issues with CLI or config file options
//!
//! Outcomes that only mean "no update possible" are not errors: the checker
//! reports them as `Ok(None)` or `UpdatedRequirements::Unfixable`.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Update check failures
    #[error(transparent)]
    Checker(#[from] CheckerError),

    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A version or constraint string that cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid version '{raw}'")]
    InvalidVersion { raw: String },

    #[error("invalid constraint '{raw}': {message}")]
    InvalidConstraint { raw: String, message: String },
}

/// Fatal outcomes of an update check
#[derive(Error, Debug)]
pub enum CheckerError {
    /// The project cannot be resolved even without updating the dependency
    #[error("dependency files are not resolvable: {message}")]
    NotResolvable { message: String },

    /// One or more package sources could not be reached
    #[error("unreachable package sources: {}", urls.join(", "))]
    SourceUnreachable { urls: Vec<String> },

    /// Credentials for a private source were rejected or missing
    #[error("authentication failed for private source {host}")]
    PrivateSourceAuthFailure { host: String },

    /// A private source did not answer in time
    #[error("timed out while contacting private source {url}")]
    PrivateSourceTimedOut { url: String },

    /// The resolver failed for a reason that cannot be classified
    #[error("resolver failed: {message}")]
    ResolverFailed { message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// The requested dependency is not declared or locked
    #[error("dependency '{name}' is not declared in {path}")]
    DependencyNotFound { name: String, path: PathBuf },
}

/// Errors related to package registry communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// Authentication error
    #[error("authentication failed for {registry}: {message}")]
    AuthenticationError { registry: String, message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("failed to parse TOML in {path}: {message}")]
    TomlParseError { path: PathBuf, message: String },

    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

impl ParseError {
    /// Creates a new InvalidVersion error
    pub fn invalid_version(raw: impl Into<String>) -> Self {
        ParseError::InvalidVersion { raw: raw.into() }
    }

    /// Creates a new InvalidConstraint error
    pub fn invalid_constraint(raw: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidConstraint {
            raw: raw.into(),
            message: message.into(),
        }
    }
}

impl CheckerError {
    /// Creates a new NotResolvable error
    pub fn not_resolvable(message: impl Into<String>) -> Self {
        CheckerError::NotResolvable {
            message: message.into(),
        }
    }

    /// Creates a new SourceUnreachable error
    pub fn source_unreachable(urls: Vec<String>) -> Self {
        CheckerError::SourceUnreachable { urls }
    }

    /// Creates a new PrivateSourceAuthFailure error
    pub fn auth_failure(host: impl Into<String>) -> Self {
        CheckerError::PrivateSourceAuthFailure { host: host.into() }
    }

    /// Creates a new PrivateSourceTimedOut error
    pub fn timed_out(url: impl Into<String>) -> Self {
        CheckerError::PrivateSourceTimedOut { url: url.into() }
    }

    /// Creates a new ResolverFailed error
    pub fn resolver_failed(message: impl Into<String>) -> Self {
        CheckerError::ResolverFailed {
            message: message.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParseError
    pub fn json_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new DependencyNotFound error
    pub fn dependency_not_found(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ManifestError::DependencyNotFound {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new AuthenticationError
    pub fn authentication_error(registry: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::AuthenticationError {
            registry: registry.into(),
            message: message.into(),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError::Checker(CheckerError::Registry(err))
    }
}
