//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Reconciler / IndicatorScheduler (domain)
//! ```
//!
//! Driven adapters (BLE stack, LED pins, clock, storage) implement these
//! traits. The domain tasks consume them via generics, so the coordination
//! logic never touches hardware directly.
//!
//! ## Concurrency notes
//!
//! - **RadioPort** and **IndicatorPort** are only ever driven from their
//!   owning task; they take `&mut self`.
//! - **LinkObserver** is invoked from the BLE stack's own task and must be
//!   `Send + Sync`; implementations only touch atomics.

use core::fmt;

use crate::config::DeviceConfig;
use crate::error::RadioError;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → BLE stack)
// ───────────────────────────────────────────────────────────────

/// Directives the reconciler may issue to the BLE stack.
///
/// Every call either succeeds or returns the stack's return code; the
/// reconciler only updates the observed flags on `Ok`.
pub trait RadioPort {
    fn start_advertising(&mut self) -> Result<(), RadioError>;

    fn stop_advertising(&mut self) -> Result<(), RadioError>;

    /// Remove every stored bond.
    fn unpair(&mut self) -> Result<(), RadioError>;

    /// Push one measurement notification to the subscribed peer.
    fn notify_measurement(&mut self, payload: &[u8]) -> Result<(), RadioError>;

    /// Bonds present in persistent storage. Only consulted at boot.
    fn stored_bond_count(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Link observer (driving adapter: BLE stack → domain)
// ───────────────────────────────────────────────────────────────

/// 48-bit Bluetooth device address, little-endian as the stack reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerAddress(pub [u8; 6]);

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[5], a[4], a[3], a[2], a[1], a[0]
        )
    }
}

/// Callbacks the BLE stack delivers about the link.
pub trait LinkObserver: Send + Sync {
    fn on_connected(&self, peer: PeerAddress);

    /// `reason` is the HCI disconnect reason code.
    fn on_disconnected(&self, reason: u8);

    /// `bonded` is true when the pairing produced a stored bond.
    fn on_pairing_complete(&self, peer: PeerAddress, bonded: bool);

    /// The peer wrote the measurement CCC descriptor.
    fn on_subscription_changed(&self, enabled: bool);
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LEDs)
// ───────────────────────────────────────────────────────────────

/// The four LED channels: a single-colour heartbeat LED and the three
/// channels of the tri-colour link LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LedId {
    Heartbeat = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl LedId {
    pub const ALL: [LedId; 4] = [LedId::Heartbeat, LedId::Red, LedId::Green, LedId::Blue];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

pub const LED_COUNT: usize = LedId::ALL.len();

/// Write-side port for the LEDs. Pin-level failures are the adapter's
/// concern; the scheduler never sees them.
pub trait IndicatorPort {
    fn set_pin(&mut self, led: LedId, on: bool);

    fn toggle_pin(&mut self, led: LedId);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot. Wraps at `u32::MAX`; consumers
/// compare with `wrapping_sub`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists device configuration.
///
/// Implementations MUST run [`DeviceConfig::validate`] before persisting
/// and after loading; invalid values are rejected, not clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`DeviceConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DeviceConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("storage I/O"),
        }
    }
}
