//! LED pin bank adapter.
//!
//! Implements [`IndicatorPort`] over any four `embedded-hal` stateful
//! output pins. On target these are `esp-idf-hal` `PinDriver`s downgraded
//! to `AnyOutputPin`; in tests they are plain in-memory pins.
//!
//! Pin errors are logged and dropped: a stuck LED must never stall the
//! indicator task.

use embedded_hal::digital::StatefulOutputPin;
use log::warn;

use crate::app::ports::{IndicatorPort, LED_COUNT, LedId};

pub struct PinBank<P> {
    /// Indexed by [`LedId::index`].
    pins: [P; LED_COUNT],
    active_low: bool,
}

impl<P: StatefulOutputPin> PinBank<P> {
    pub fn new(heartbeat: P, red: P, green: P, blue: P) -> Self {
        Self {
            pins: [heartbeat, red, green, blue],
            active_low: false,
        }
    }

    /// For LEDs wired between the supply and the pin.
    pub fn active_low(mut self) -> Self {
        self.active_low = true;
        self
    }

    /// Logical level of one channel, as last driven.
    pub fn is_on(&mut self, led: LedId) -> bool {
        let active_low = self.active_low;
        match self.pins[led.index()].is_set_high() {
            Ok(high) => high != active_low,
            Err(_) => false,
        }
    }
}

impl<P: StatefulOutputPin> IndicatorPort for PinBank<P> {
    fn set_pin(&mut self, led: LedId, on: bool) {
        let pin = &mut self.pins[led.index()];
        let result = if on != self.active_low {
            pin.set_high()
        } else {
            pin.set_low()
        };
        if result.is_err() {
            warn!("LED {:?}: set failed", led);
        }
    }

    fn toggle_pin(&mut self, led: LedId) {
        if self.pins[led.index()].toggle().is_err() {
            warn!("LED {:?}: toggle failed", led);
        }
    }
}
