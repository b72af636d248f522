//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 3-9     | recon     | Reconciliation codes                     |
//! | 10-19   | alert     | Threshold check and notification codes   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use costrecon_alert::AlertError;
use costrecon_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// Source CSV unreadable, missing a column, holding an unparseable value,
/// or holding amounts whose sums leave the decimal range.
pub const EXIT_RECON_INPUT: u8 = 4;

/// Data-quality issues found (only with --fail-on-data-quality).
pub const EXIT_RECON_DATA_QUALITY: u8 = 5;

/// Cannot write JSON or CSV output.
pub const EXIT_RECON_OUTPUT: u8 = 6;

// =============================================================================
// Alert (10-19)
// =============================================================================

/// Metric exceeded its threshold. Like `diff(1)`, a finding, not a failure.
pub const EXIT_ALERT_EXCEEDED: u8 = 10;

/// Alert settings failed to parse or validate.
pub const EXIT_ALERT_INVALID_SETTINGS: u8 = 11;

/// Secret environment variable unset or empty.
pub const EXIT_ALERT_NOT_AUTH: u8 = 12;

/// Upstream call failed (network, non-2xx, bad body, failed job run).
pub const EXIT_ALERT_UPSTREAM: u8 = 13;

/// Job polling ran out of attempts or deadline, or was cancelled.
pub const EXIT_ALERT_TIMEOUT: u8 = 14;

/// No finished run carries the metric yet.
pub const EXIT_ALERT_NOT_READY: u8 = 15;

// =============================================================================
// Error mapping
// =============================================================================

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::InvalidRange { .. } => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::DateParse { .. }
        | ReconError::AmountParse { .. }
        | ReconError::AmountOverflow { .. }
        | ReconError::Csv(_)
        | ReconError::Io(_) => EXIT_RECON_INPUT,
    }
}

/// Map an AlertError to its exit code.
pub fn alert_exit_code(err: &AlertError) -> u8 {
    match err {
        AlertError::SettingsParse(_) | AlertError::SettingsValidation(_) => {
            EXIT_ALERT_INVALID_SETTINGS
        }
        AlertError::MissingEnv { .. } => EXIT_ALERT_NOT_AUTH,
        AlertError::Network(_)
        | AlertError::Http { .. }
        | AlertError::Parse(_)
        | AlertError::JobFailed { .. } => EXIT_ALERT_UPSTREAM,
        AlertError::Timeout { .. } | AlertError::Cancelled { .. } => EXIT_ALERT_TIMEOUT,
        AlertError::Io(_) => EXIT_USAGE,
    }
}

/// Map a handler HTTP-style status onto the shell contract.
pub fn handler_exit_code(status_code: u16) -> u8 {
    match status_code {
        202 => EXIT_ALERT_NOT_READY,
        200..=299 => EXIT_SUCCESS,
        _ => EXIT_ALERT_UPSTREAM,
    }
}
