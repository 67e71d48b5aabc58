//! LED feedback scheduler.
//!
//! Renders the status register on two physical LEDs: a heartbeat LED and a
//! tri-colour link LED (red/green/blue channels). Ticks alternate between
//! two phases so each phase runs at half the task rate.
//!
//! | Phase | Work                                                          |
//! |-------|---------------------------------------------------------------|
//! | A     | heartbeat blink (fast while advertising is requested, slow    |
//! |       | otherwise), blue blinks with it while bonded and unconnected, |
//! |       | steady blue while advertising unbonded, bond hint             |
//! | B     | red follows the connection, factory-reset flash               |
//!
//! The reset flash is split in two: `tick` drives every channel on and
//! returns a [`ResetFlash`]; the owning task waits out the dwell and then
//! calls [`IndicatorScheduler::finish_reset_flash`]. Only the indicator
//! task stalls; the register keeps `ResetRequested` for the whole dwell.

use log::info;

use super::ports::{IndicatorPort, LedId};
use crate::config::DeviceConfig;
use crate::status::{DeviceStatus, StatusFlag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorTiming {
    pub heartbeat_fast_ms: u32,
    pub heartbeat_slow_ms: u32,
    pub reset_dwell_ms: u32,
}

impl From<&DeviceConfig> for IndicatorTiming {
    fn from(c: &DeviceConfig) -> Self {
        Self {
            heartbeat_fast_ms: c.heartbeat_fast_ms,
            heartbeat_slow_ms: c.heartbeat_slow_ms,
            reset_dwell_ms: c.reset_dwell_ms,
        }
    }
}

impl Default for IndicatorTiming {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

/// Returned by a tick that started the factory-reset flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetFlash {
    pub dwell_ms: u32,
}

pub struct IndicatorScheduler<'a> {
    status: &'a DeviceStatus,
    timing: IndicatorTiming,
    /// false = phase A next.
    parity: bool,
    last_heartbeat_ms: u32,
    blue_on: bool,
    red_on: bool,
}

impl<'a> IndicatorScheduler<'a> {
    pub fn new(status: &'a DeviceStatus, timing: IndicatorTiming, now_ms: u32) -> Self {
        Self {
            status,
            timing,
            parity: false,
            last_heartbeat_ms: now_ms,
            blue_on: false,
            red_on: false,
        }
    }

    pub fn tick<P: IndicatorPort>(&mut self, now_ms: u32, leds: &mut P) -> Option<ResetFlash> {
        let phase_b = self.parity;
        self.parity = !self.parity;

        if phase_b {
            self.render_link(leds);
            self.start_reset_flash(leds)
        } else {
            self.render_heartbeat(now_ms, leds);
            self.render_advertising(leds);
            self.render_bond_hint(leds);
            None
        }
    }

    /// End the reset flash: every channel off, tracked levels forgotten,
    /// `ResetRequested` cleared.
    pub fn finish_reset_flash<P: IndicatorPort>(&mut self, now_ms: u32, leds: &mut P) {
        for led in LedId::ALL {
            leds.set_pin(led, false);
        }
        self.blue_on = false;
        self.red_on = false;
        self.last_heartbeat_ms = now_ms;
        self.status.clear(StatusFlag::ResetRequested);
        info!("indicator: reset flash complete");
    }

    // ── Phase A ───────────────────────────────────────────────

    fn render_heartbeat<P: IndicatorPort>(&mut self, now_ms: u32, leds: &mut P) {
        let period = if self.status.test(StatusFlag::AdvertisingRequested) {
            self.timing.heartbeat_fast_ms
        } else {
            self.timing.heartbeat_slow_ms
        };
        if now_ms.wrapping_sub(self.last_heartbeat_ms) <= period {
            return;
        }

        leds.toggle_pin(LedId::Heartbeat);
        if self.status.test(StatusFlag::Bonded) && !self.status.test(StatusFlag::Connected) {
            leds.toggle_pin(LedId::Blue);
        }
        self.last_heartbeat_ms = now_ms;
    }

    fn render_advertising<P: IndicatorPort>(&mut self, leds: &mut P) {
        let advertising = self.status.test(StatusFlag::AdvertisingRequested);
        let bonded = self.status.test(StatusFlag::Bonded);
        let connected = self.status.test(StatusFlag::Connected);

        if advertising && !connected && !bonded && !self.blue_on {
            self.blue_on = true;
            leds.set_pin(LedId::Blue, true);
        } else if !advertising && !bonded && self.blue_on {
            self.blue_on = false;
            leds.set_pin(LedId::Blue, false);
        }
    }

    fn render_bond_hint<P: IndicatorPort>(&mut self, leds: &mut P) {
        if self.status.take_bond_hint() {
            self.blue_on = true;
            leds.set_pin(LedId::Blue, true);
        }
    }

    // ── Phase B ───────────────────────────────────────────────

    fn render_link<P: IndicatorPort>(&mut self, leds: &mut P) {
        let connected = self.status.test(StatusFlag::Connected);
        if connected && !self.red_on {
            self.red_on = true;
            self.blue_on = false;
            leds.set_pin(LedId::Blue, false);
            leds.set_pin(LedId::Red, true);
        } else if !connected && self.red_on {
            self.red_on = false;
            leds.set_pin(LedId::Red, false);
        }
    }

    fn start_reset_flash<P: IndicatorPort>(&mut self, leds: &mut P) -> Option<ResetFlash> {
        if !self.status.test(StatusFlag::ResetRequested) {
            return None;
        }
        info!("indicator: reset flash");
        for led in LedId::ALL {
            leds.set_pin(led, true);
        }
        Some(ResetFlash {
            dwell_ms: self.timing.reset_dwell_ms,
        })
    }
}
