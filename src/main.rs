//! BPSLink Firmware: Main Entry Point
//!
//! Blood-pressure BLE peripheral: one button drives advertising, bonding
//! and reset; four LEDs report what the radio is doing.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleRadio        PinBank          NvsConfigStore  Monotonic    │
//! │  (RadioPort)     (IndicatorPort)  (ConfigPort)    (Clock)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   DeviceStatus (atomic flag word, shared by all)       │    │
//! │  │   Input · Reconcile · Indicator                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Button ISR → dispatch queue → input task                      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use log::{info, warn};

use bpslink::adapters::ble::BleRadio;
use bpslink::adapters::indicators::PinBank;
use bpslink::adapters::nvs::NvsConfigStore;
use bpslink::adapters::time::MonotonicClock;
use bpslink::app::boot::apply_boot_policy;
use bpslink::app::ports::{ConfigPort, IndicatorPort, LedId};
use bpslink::config::DeviceConfig;
use bpslink::events::{DispatchEvent, ModuleId, push_event};
use bpslink::status::DeviceStatus;
use bpslink::{drivers, pins, runtime};

const DEVICE_NAME: &str = "BPSLink";

static DEVICE_STATUS: DeviceStatus = DeviceStatus::new();

fn output_pin(gpio: i32) -> Result<PinDriver<'static, AnyOutputPin, Output>> {
    // SAFETY: every LED GPIO number in `pins` is used exactly once here.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    Ok(PinDriver::output(pin)?)
}

fn announce_ready(module: ModuleId) {
    if !push_event(DispatchEvent::ModuleReady(module)) {
        warn!("dispatch queue full, {:?} ready event lost", module);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BPSLink v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    // NVS must be up before Bluedroid, which keeps its bonds there.
    let config = match NvsConfigStore::new() {
        Ok(store) => match store.load() {
            Ok(cfg) => {
                info!("Config loaded from NVS");
                cfg
            }
            Err(e) => {
                warn!("NVS config load failed ({}), using defaults", e);
                DeviceConfig::default()
            }
        },
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            DeviceConfig::default()
        }
    };

    // ── 3. Indicators ─────────────────────────────────────────
    let mut leds = PinBank::new(
        output_pin(pins::LED_HEARTBEAT_GPIO)?,
        output_pin(pins::LED_RED_GPIO)?,
        output_pin(pins::LED_GREEN_GPIO)?,
        output_pin(pins::LED_BLUE_GPIO)?,
    );
    for led in LedId::ALL {
        leds.set_pin(led, false);
    }
    announce_ready(ModuleId::Leds);

    // ── 4. Buttons ────────────────────────────────────────────
    drivers::button::init_buttons()?;
    announce_ready(ModuleId::Buttons);

    // ── 5. Radio ──────────────────────────────────────────────
    let mut radio = BleRadio::new(DEVICE_NAME)?;
    radio.attach_observer(&DEVICE_STATUS);
    apply_boot_policy(&DEVICE_STATUS, &config, &radio);
    announce_ready(ModuleId::Radio);

    info!("System ready, status {}", DEVICE_STATUS.snapshot());

    // ── 6. Coordination tasks ─────────────────────────────────
    let coord = runtime::spawn(&DEVICE_STATUS, config, radio, leds, MonotonicClock::new())?;
    if coord.join().is_err() {
        anyhow::bail!("coordination thread panicked");
    }
    Ok(())
}
