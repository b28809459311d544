use std::time::Duration;

use thiserror::Error;

/// Which print endpoint a failure belongs to. Transfer-level failures are
/// reported with a job-specific code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintJob {
    Test,
    Sale,
}

impl PrintJob {
    pub fn ok_code(self) -> &'static str {
        match self {
            PrintJob::Test => "PRINT_TEST_OK",
            PrintJob::Sale => "PRINT_SALE_OK",
        }
    }

    pub fn error_code(self) -> &'static str {
        match self {
            PrintJob::Test => "PRINT_TEST_ERROR",
            PrintJob::Sale => "PRINT_SALE_ERROR",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrintError {
    #[error("Print agent is disabled")]
    AgentDisabled,

    #[error("No thermal printer found on USB")]
    PrinterNotFound,

    #[error("No OUT endpoint on interface {interface} of {device}")]
    OutEndpointNotFound { device: String, interface: u8 },

    #[error("Failed to open USB device {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("Failed to claim interface {interface} on {device}: {reason}")]
    Claim {
        device: String,
        interface: u8,
        reason: String,
    },

    #[error("USB transfer failed: {0}")]
    Transfer(String),

    #[error("USB job timed out after {0:?}")]
    Timeout(Duration),

    #[error("USB enumeration failed: {0}")]
    AccessDenied(String),

    #[error("Invalid default printer: {0}")]
    InvalidDefault(String),

    #[error("Invalid sale payload: {0}")]
    InvalidPayload(String),

    #[error("Print worker failed: {0}")]
    Worker(String),
}

impl PrintError {
    /// Wire code reported to the client for this failure.
    pub fn code(&self, job: PrintJob) -> &'static str {
        match self {
            PrintError::AgentDisabled => "AGENT_OFF",
            PrintError::PrinterNotFound => "THERMAL_PRINTER_NOT_FOUND",
            PrintError::OutEndpointNotFound { .. } | PrintError::Claim { .. } => {
                "USB_OUT_ENDPOINT_NOT_FOUND"
            }
            PrintError::Timeout(_) => "USB_TIMEOUT",
            PrintError::InvalidDefault(_) => "DEFAULT_PRINTER_INVALID",
            PrintError::Open { .. }
            | PrintError::Transfer(_)
            | PrintError::AccessDenied(_)
            | PrintError::InvalidPayload(_)
            | PrintError::Worker(_) => job.error_code(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
