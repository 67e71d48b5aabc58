//! Unified error types for the BPSLink firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! bootstrap's error handling uniform. All variants are `Copy` so they can
//! be passed through the tick loops without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The BLE stack rejected a directive.
    Radio(RadioError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Radio directive errors
// ---------------------------------------------------------------------------

/// A directive the BLE stack refused. Carries the raw stack return code.
///
/// These are never fatal: the reconciler logs them and leaves the status
/// flags unreconciled, so the next tick issues the directive again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    AdvertisingStart(i32),
    AdvertisingStop(i32),
    Unpair(i32),
    Notify(i32),
    /// The stack has not finished initialising.
    NotReady,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdvertisingStart(rc) => write!(f, "advertising start failed (rc={rc})"),
            Self::AdvertisingStop(rc) => write!(f, "advertising stop failed (rc={rc})"),
            Self::Unpair(rc) => write!(f, "unpair failed (rc={rc})"),
            Self::Notify(rc) => write!(f, "notification failed (rc={rc})"),
            Self::NotReady => write!(f, "stack not ready"),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for RadioError {}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
