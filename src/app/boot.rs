//! Boot-time seeding of the status register.
//!
//! The register always starts all-false; this applies the configured boot
//! policy on top before any task runs.

use log::info;

use super::ports::RadioPort;
use crate::config::DeviceConfig;
use crate::status::{DeviceStatus, StatusFlag};

pub fn apply_boot_policy<R: RadioPort>(status: &DeviceStatus, config: &DeviceConfig, radio: &R) {
    if config.advertise_on_boot {
        status.set(StatusFlag::AdvertisingRequested);
    }

    let stored = radio.stored_bond_count();
    if stored > 0 {
        if config.keep_stored_bond {
            // Both flags, or the first reconcile tick would unpair it.
            status.set(StatusFlag::BondingRequested);
            status.set(StatusFlag::Bonded);
            info!("boot: {} stored bond(s) kept", stored);
        } else {
            // Bonded without the request: reconcile removes it.
            status.set(StatusFlag::Bonded);
            info!("boot: {} stored bond(s) will be removed", stored);
        }
    }

    info!("boot: status {}", status.snapshot());
}
