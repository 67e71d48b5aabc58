//! Reconciliation loop: drives the BLE stack toward the requested state.
//!
//! Each tick compares desired flags against observed flags and issues at
//! most one directive per mismatch:
//!
//! | Desired            | Observed            | Directive             |
//! |--------------------|---------------------|-----------------------|
//! | adv requested      | adv not active      | `start_advertising()` |
//! | adv not requested  | adv active          | `stop_advertising()`  |
//! | bond not requested | bonded              | `unpair()`            |
//! | bonded, subscribed | not yet notified    | `notify_measurement()`|
//!
//! Directive failures are logged and leave the flags untouched, so the next
//! tick retries. Stack callbacks come back through [`LinkObserver`], which
//! [`DeviceStatus`] implements directly.

use log::{info, warn};

use super::ports::{LinkObserver, PeerAddress, RadioPort};
use crate::measurement::{BloodPressureMeasurement, MeasurementPayload};
use crate::status::{DeviceStatus, StatusFlag};

pub struct Reconciler<'a> {
    status: &'a DeviceStatus,
    payload: MeasurementPayload,
    notified: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(status: &'a DeviceStatus) -> Self {
        Self::with_measurement(status, &BloodPressureMeasurement::sample())
    }

    pub fn with_measurement(status: &'a DeviceStatus, measurement: &BloodPressureMeasurement) -> Self {
        Self {
            status,
            payload: measurement.encode(),
            notified: false,
        }
    }

    pub fn tick<R: RadioPort>(&mut self, radio: &mut R) {
        self.reconcile_advertising(radio);
        self.reconcile_bond(radio);
        self.reconcile_notification(radio);
    }

    fn reconcile_advertising<R: RadioPort>(&self, radio: &mut R) {
        let requested = self.status.test(StatusFlag::AdvertisingRequested);
        let active = self.status.test(StatusFlag::AdvertisingActive);

        if requested && !active {
            match radio.start_advertising() {
                Ok(()) => {
                    self.status.set(StatusFlag::AdvertisingActive);
                    info!("Advertising successfully started");
                }
                Err(e) => warn!("reconcile: {}", e),
            }
        } else if !requested && active {
            match radio.stop_advertising() {
                Ok(()) => {
                    self.status.clear(StatusFlag::AdvertisingActive);
                    info!("Advertising successfully stopped");
                }
                Err(e) => warn!("reconcile: {}", e),
            }
        }
    }

    fn reconcile_bond<R: RadioPort>(&self, radio: &mut R) {
        // Enabling bonding is declarative: the stack pairs on its own when a
        // peer asks. Only withdrawing it needs a directive.
        if !self.status.test(StatusFlag::BondingRequested) && self.status.test(StatusFlag::Bonded) {
            match radio.unpair() {
                Ok(()) => {
                    self.status.clear(StatusFlag::Bonded);
                    info!("Unpaired");
                }
                Err(e) => warn!("reconcile: {}", e),
            }
        }
    }

    fn reconcile_notification<R: RadioPort>(&mut self, radio: &mut R) {
        let ready =
            self.status.test(StatusFlag::Subscribed) && self.status.test(StatusFlag::Bonded);
        if !ready {
            self.notified = false;
            return;
        }
        if self.notified {
            return;
        }
        match radio.notify_measurement(&self.payload) {
            Ok(()) => {
                self.notified = true;
                info!("Measurement notified ({} bytes)", self.payload.len());
            }
            Err(e) => warn!("reconcile: {}", e),
        }
    }
}

// ── Stack callbacks ───────────────────────────────────────────

impl LinkObserver for DeviceStatus {
    fn on_connected(&self, peer: PeerAddress) {
        info!("Connected {}", peer);
        self.set(StatusFlag::Connected);
    }

    fn on_disconnected(&self, reason: u8) {
        info!("Disconnected (reason 0x{:02x})", reason);
        self.clear(StatusFlag::Subscribed);
        self.clear(StatusFlag::Connected);
    }

    fn on_pairing_complete(&self, peer: PeerAddress, bonded: bool) {
        info!("Pairing completed: {}, bonded: {}", peer, bonded);
        if bonded {
            self.set(StatusFlag::Bonded);
        }
    }

    fn on_subscription_changed(&self, enabled: bool) {
        info!("Measurement notifications {}", if enabled { "enabled" } else { "disabled" });
        if enabled {
            self.set(StatusFlag::Subscribed);
        } else {
            self.clear(StatusFlag::Subscribed);
        }
    }
}
