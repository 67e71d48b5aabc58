//! Lock-free device status register.
//!
//! One `AtomicU8` holds every desired/observed flag of the device. The click
//! handler, the reconcile task, the indicator task and the BLE stack
//! callbacks all coordinate exclusively through this register; none of them
//! call each other directly.
//!
//! ```text
//!  bit  7   6    5     4     3     2     1     0
//!      ┌───┬────┬─────┬─────┬─────┬─────┬─────┬─────┐
//!      │ - │SUB │RESET│CONN │BOND │BREQ │ADVA │AREQ │
//!      └───┴────┴─────┴─────┴─────┴─────┴─────┴─────┘
//! ```

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// One named bit of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusFlag {
    /// The user wants advertising on.
    AdvertisingRequested = 0,
    /// The stack confirmed advertising is running.
    AdvertisingActive = 1,
    /// The user wants bonding enabled.
    BondingRequested = 2,
    /// The stack confirmed an active bond exists.
    Bonded = 3,
    /// A peer is currently connected.
    Connected = 4,
    /// The user requested a factory reset; cleared after the reset flash.
    ResetRequested = 5,
    /// The connected peer enabled measurement notifications.
    Subscribed = 6,
}

impl StatusFlag {
    pub const ALL: [StatusFlag; 7] = [
        StatusFlag::AdvertisingRequested,
        StatusFlag::AdvertisingActive,
        StatusFlag::BondingRequested,
        StatusFlag::Bonded,
        StatusFlag::Connected,
        StatusFlag::ResetRequested,
        StatusFlag::Subscribed,
    ];

    #[inline]
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

const INTENT_MASK: u8 =
    StatusFlag::AdvertisingRequested.mask() | StatusFlag::BondingRequested.mask();

// ── Register ──────────────────────────────────────────────────

/// Process-wide status register.
///
/// Every single-flag operation is one atomic read-modify-write. The only
/// multi-flag update, [`request_reset`](Self::request_reset), is a single
/// compare-exchange so no reader ever observes the reset signal while
/// advertising or bonding intent is still set.
#[derive(Debug)]
pub struct DeviceStatus {
    bits: AtomicU8,
    bond_hint: AtomicBool,
}

impl DeviceStatus {
    /// All flags false, no pending hint.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
            bond_hint: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn test(&self, flag: StatusFlag) -> bool {
        self.bits.load(Ordering::Acquire) & flag.mask() != 0
    }

    #[inline]
    pub fn set(&self, flag: StatusFlag) {
        self.bits.fetch_or(flag.mask(), Ordering::AcqRel);
    }

    #[inline]
    pub fn clear(&self, flag: StatusFlag) {
        self.bits.fetch_and(!flag.mask(), Ordering::AcqRel);
    }

    /// Flip `flag` and return its new value.
    #[inline]
    pub fn toggle(&self, flag: StatusFlag) -> bool {
        let prev = self.bits.fetch_xor(flag.mask(), Ordering::AcqRel);
        prev & flag.mask() == 0
    }

    /// Cancel advertising and bonding intent and raise `ResetRequested` in
    /// one atomic update.
    pub fn request_reset(&self) {
        // fetch_update only fails when the closure returns None.
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((bits & !INTENT_MASK) | StatusFlag::ResetRequested.mask())
            });
    }

    /// Plain-data copy of every flag, taken from one load.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            bits: self.bits.load(Ordering::Acquire),
        }
    }

    /// Ask the indicator scheduler to force the bonding LED on for one phase.
    pub fn raise_bond_hint(&self) {
        self.bond_hint.store(true, Ordering::Release);
    }

    /// Consume the pending bond hint, if any.
    pub fn take_bond_hint(&self) -> bool {
        self.bond_hint.swap(false, Ordering::AcqRel)
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::new()
    }
}

// ── Snapshot ──────────────────────────────────────────────────

/// Immutable copy of the register, used for logging and boot reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    bits: u8,
}

impl StatusSnapshot {
    #[inline]
    pub fn get(&self, flag: StatusFlag) -> bool {
        self.bits & flag.mask() != 0
    }

    pub fn advertising_requested(&self) -> bool {
        self.get(StatusFlag::AdvertisingRequested)
    }

    pub fn bonding_requested(&self) -> bool {
        self.get(StatusFlag::BondingRequested)
    }

    pub fn raw(&self) -> u8 {
        self.bits
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on = |flag| if self.get(flag) { "on" } else { "off" };
        write!(
            f,
            "adv={}/{} bond={}/{} conn={} sub={} reset={}",
            on(StatusFlag::AdvertisingRequested),
            on(StatusFlag::AdvertisingActive),
            on(StatusFlag::BondingRequested),
            on(StatusFlag::Bonded),
            on(StatusFlag::Connected),
            on(StatusFlag::Subscribed),
            on(StatusFlag::ResetRequested),
        )
    }
}
