//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the coordination rules for the BPSLink device:
//! click classification, reconciliation against the BLE stack, and LED
//! feedback. All interaction with hardware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod boot;
pub mod click;
pub mod indicator;
pub mod input;
pub mod ports;
pub mod reconcile;
