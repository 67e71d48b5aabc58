//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements     | Connects to                 |
//! |--------------|----------------|-----------------------------|
//! | `ble`        | RadioPort      | Bluedroid GAP/GATT server   |
//! | `indicators` | IndicatorPort  | embedded-hal output pins    |
//! | `nvs`        | ConfigPort     | NVS / in-memory store       |
//! | `time`       | Clock          | ESP32 system timer          |

pub mod ble;
pub mod indicators;
pub mod nvs;
pub mod time;
