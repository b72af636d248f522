use thiserror::Error;

/// Error type for alerting operations.
#[derive(Debug, Error)]
pub enum AlertError {
    /// TOML parse / deserialization error.
    #[error("settings parse error: {0}")]
    SettingsParse(String),
    /// Settings validation error (bad threshold, zero attempts, etc.).
    #[error("settings validation error: {0}")]
    SettingsValidation(String),
    /// A secret referenced by env var name is unset or empty.
    #[error("environment variable {var} not set (needed for {label})")]
    MissingEnv { var: String, label: String },
    /// Transport failure (connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
    /// Triggered job run reached a final state other than success.
    #[error("job run {run_id} did not succeed: {state}")]
    JobFailed { run_id: u64, state: String },
    /// Poll loop ran out of attempts or hit its deadline.
    #[error("timed out after {attempts} poll attempt(s)")]
    Timeout { attempts: u32 },
    /// Poll loop observed the cancel flag.
    #[error("polling cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AlertError {
    fn from(e: reqwest::Error) -> Self {
        AlertError::Network(e.to_string())
    }
}
