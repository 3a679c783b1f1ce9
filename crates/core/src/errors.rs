//! Error types for the samsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and the
//! top-level [`SyncError`] enum unifies the fatal categories that abort a
//! sync run. Recoverable conditions (a single record failing, an attachment
//! download or upload failing) never surface here; they are handled at the
//! orchestrator's per-record boundary.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Fatal error that aborts an entire sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Sam(#[from] SamError),

    #[error(transparent)]
    SharePoint(#[from] SharePointError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing {
        var: String,
        field: String,
    },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Azure AD token errors
// ---------------------------------------------------------------------------

/// Errors acquiring bearer tokens from Azure AD via the client-credentials
/// flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("token endpoint HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The token endpoint returned a non-success status.
    #[error("token request failed (HTTP {status}): {body}")]
    TokenRequestFailed {
        status: u16,
        body: String,
    },

    /// The endpoint answered 2xx but did not include an access token.
    #[error("no access token returned for scope '{scope}': {detail}")]
    TokenMissing {
        scope: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// SAM.gov API errors
// ---------------------------------------------------------------------------

/// Errors from SAM.gov API interactions.
#[derive(Debug, Error)]
pub enum SamError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("SAM.gov HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("SAM.gov API error (HTTP {status}): {body}")]
    ApiError {
        status: u16,
        body: String,
    },

    /// The paged fetch did not converge on the reported total.
    ///
    /// SAM.gov re-reports `totalRecords` on every page; if that total keeps
    /// moving the accumulation loop would never terminate, so it is cut off
    /// after a fixed page budget.
    #[error("pagination did not converge after {pages} pages (last reported total: {total})")]
    PaginationDiverged {
        pages: u32,
        total: u64,
    },
}

// ---------------------------------------------------------------------------
// SharePoint errors
// ---------------------------------------------------------------------------

/// Errors from Graph / SharePoint REST API interactions.
#[derive(Debug, Error)]
pub enum SharePointError {
    /// HTTP-level transport error.
    #[error("SharePoint HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("SharePoint API error (HTTP {status}): {body}")]
    ApiError {
        status: u16,
        body: String,
    },

    /// No list in the resolved site matches the configured display name.
    #[error("SharePoint list not found: '{0}'")]
    ListNotFound(String),

    /// An operation was attempted before `authenticate` succeeded.
    #[error("SharePoint client is not authenticated (missing {scope} token)")]
    NotAuthenticated {
        scope: String,
    },

    /// Token acquisition failed.
    #[error("SharePoint authentication error: {0}")]
    AuthError(#[from] AuthError),
}
