//! Input handler: dispatch events in, status mutations out.
//!
//! Owns the [`ClickDetector`] and applies each classified click of the
//! advertising button to the [`DeviceStatus`] register:
//!
//! | Click  | Effect                                                   |
//! |--------|----------------------------------------------------------|
//! | Short  | toggle `AdvertisingRequested`                            |
//! | Long   | `request_reset()` (cancels adv + bond intent atomically) |
//! | Double | toggle `BondingRequested`, raise the bond LED hint       |

use log::{debug, info};

use super::click::{ADVERTISING_BUTTON, ClickDetector, ClickEvent, ClickKind, ClickTiming};
use crate::events::{DispatchEvent, ModuleId};
use crate::status::{DeviceStatus, StatusFlag};

pub struct InputHandler<'a> {
    status: &'a DeviceStatus,
    detector: ClickDetector,
}

impl<'a> InputHandler<'a> {
    pub fn new(status: &'a DeviceStatus, timing: ClickTiming) -> Self {
        Self {
            status,
            detector: ClickDetector::new(timing),
        }
    }

    /// Handle one event drained from the dispatch queue.
    pub fn handle(&mut self, event: DispatchEvent) {
        match event {
            DispatchEvent::ButtonEdge {
                key_id,
                pressed,
                at_ms,
            } => {
                if let Some(click) = self.detector.on_edge(key_id, pressed, at_ms) {
                    self.apply(click);
                }
            }
            DispatchEvent::ModuleReady(ModuleId::Leds) => info!("input: LEDs ready"),
            DispatchEvent::ModuleReady(module) => debug!("input: {:?} ready", module),
        }
    }

    /// Button edges were dropped before reaching the queue. Whatever
    /// gesture was in progress is abandoned rather than guessed at.
    pub fn edges_lost(&mut self) {
        debug!("input: abandoning gestures after lost edges");
        self.detector.reset();
    }

    /// Resolve time-based clicks (long hold, expired double window).
    pub fn poll(&mut self, now_ms: u32) {
        let status = self.status;
        self.detector.poll(now_ms, |click| apply_click(status, click));
    }

    pub fn apply(&self, click: ClickEvent) {
        apply_click(self.status, click);
    }
}

fn apply_click(status: &DeviceStatus, click: ClickEvent) {
    if click.button != ADVERTISING_BUTTON {
        debug!("input: {:?} on button {} ignored", click.kind, click.button);
        return;
    }

    match click.kind {
        ClickKind::Short => {
            let on = status.toggle(StatusFlag::AdvertisingRequested);
            info!("input: {} advertising", if on { "enable" } else { "disable" });
        }
        ClickKind::Long => {
            info!("input: disable advertising and bonding (reset)");
            status.request_reset();
        }
        ClickKind::Double => {
            let on = status.toggle(StatusFlag::BondingRequested);
            status.raise_bond_hint();
            info!("input: {} bonding", if on { "enable" } else { "disable" });
        }
    }
}
