//! Click-pattern classifier.
//!
//! Turns timestamped press/release edges into `Short`, `Long` and `Double`
//! clicks. The classifier is fed from the input task: edges come out of the
//! dispatch queue, and [`ClickDetector::poll`] runs every tick so that long
//! presses and expired double-click windows resolve without another edge.
//!
//! ## Gesture table
//!
//! | Gesture | Condition                                             |
//! |---------|-------------------------------------------------------|
//! | Long    | held >= `long_press_ms` (fires while still held)      |
//! | Double  | second press starts < `double_click_window_ms` after  |
//! |         | the first release, then released before long          |
//! | Short   | released before long, no second press inside window   |
//!
//! ```text
//!          press            release (< long)        press (gap < window)
//!  Idle ─────────▶ Pressed ─────────────▶ Released ─────────────▶ PressedAgain
//!   ▲                 │ held >= long         │ gap >= window           │ release
//!   │                 ▼                      ▼                         ▼
//!   │             LongHeld ── release ──▶  Idle (Short)           Idle (Double)
//! ```

use log::debug;

use crate::config::DeviceConfig;

/// Identifier of a physical button.
pub type ButtonId = u8;

/// The button that drives advertising, bonding and reset.
pub const ADVERTISING_BUTTON: ButtonId = 0;

/// Number of buttons the board wires up.
pub const BUTTON_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Short,
    Long,
    Double,
}

/// A classified click. Produced once, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub button: ButtonId,
    pub kind: ClickKind,
}

/// The three thresholds the classifier needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickTiming {
    pub debounce_ms: u32,
    pub double_click_window_ms: u32,
    pub long_press_ms: u32,
}

impl From<&DeviceConfig> for ClickTiming {
    fn from(c: &DeviceConfig) -> Self {
        Self {
            debounce_ms: c.debounce_ms,
            double_click_window_ms: c.double_click_window_ms,
            long_press_ms: c.long_press_ms,
        }
    }
}

impl Default for ClickTiming {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickState {
    Idle,
    Pressed { since_ms: u32 },
    Released { at_ms: u32 },
    PressedAgain { since_ms: u32 },
    /// A long press already fired; waiting for the release.
    LongHeld,
}

// ── Single-button classifier ──────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClickClassifier {
    timing: ClickTiming,
    state: ClickState,
    last_edge_ms: Option<u32>,
    /// Newest edge absorbed by debounce whose level disagrees with `state`.
    /// Applied by `poll` once the debounce interval has passed.
    pending: Option<(bool, u32)>,
}

impl ClickClassifier {
    pub fn new(timing: ClickTiming) -> Self {
        Self {
            timing,
            state: ClickState::Idle,
            last_edge_ms: None,
            pending: None,
        }
    }

    /// No gesture in progress.
    pub fn is_idle(&self) -> bool {
        self.state == ClickState::Idle
    }

    /// Drop any gesture in progress, including an unsettled edge.
    pub fn reset(&mut self) {
        self.state = ClickState::Idle;
        self.pending = None;
    }

    /// Button level the current state implies.
    fn held(&self) -> bool {
        matches!(
            self.state,
            ClickState::Pressed { .. } | ClickState::PressedAgain { .. } | ClickState::LongHeld
        )
    }

    /// Feed one raw edge. Returns a click when the edge completes one.
    ///
    /// An edge inside the debounce interval is not dropped: if it leaves
    /// the button at a different level, it is kept and applied later.
    pub fn on_edge(&mut self, pressed: bool, now_ms: u32) -> Option<ClickKind> {
        if let Some(last) = self.last_edge_ms {
            if now_ms.wrapping_sub(last) < self.timing.debounce_ms {
                debug!("click: edge absorbed by debounce");
                self.pending = (pressed != self.held()).then_some((pressed, now_ms));
                return None;
            }
        }

        // A pending edge can complete at most a Double, after which this
        // edge cannot complete anything, so at most one click comes out.
        let settled = self.settle();
        let click = self.transition(pressed, now_ms);
        settled.or(click)
    }

    /// Resolve time-based transitions. Call at least every few tens of
    /// milliseconds while a gesture is in progress.
    pub fn poll(&mut self, now_ms: u32) -> Option<ClickKind> {
        let t = self.timing;
        if self.pending.is_some() {
            let quiet = self
                .last_edge_ms
                .is_none_or(|last| now_ms.wrapping_sub(last) >= t.debounce_ms);
            if !quiet {
                // Level still unsettled; the timers below assume it is not.
                return None;
            }
            if let Some(click) = self.settle() {
                return Some(click);
            }
        }

        match self.state {
            ClickState::Pressed { since_ms } | ClickState::PressedAgain { since_ms }
                if now_ms.wrapping_sub(since_ms) >= t.long_press_ms =>
            {
                self.state = ClickState::LongHeld;
                Some(ClickKind::Long)
            }
            ClickState::Released { at_ms }
                if now_ms.wrapping_sub(at_ms) >= t.double_click_window_ms =>
            {
                self.state = ClickState::Idle;
                Some(ClickKind::Short)
            }
            _ => None,
        }
    }

    fn settle(&mut self) -> Option<ClickKind> {
        let (pressed, at_ms) = self.pending.take()?;
        self.transition(pressed, at_ms)
    }

    fn transition(&mut self, pressed: bool, now_ms: u32) -> Option<ClickKind> {
        let t = self.timing;
        let (next, click) = match (self.state, pressed) {
            (ClickState::Idle, true) => (ClickState::Pressed { since_ms: now_ms }, None),

            (ClickState::Pressed { since_ms }, false) => {
                if now_ms.wrapping_sub(since_ms) >= t.long_press_ms {
                    (ClickState::Idle, Some(ClickKind::Long))
                } else {
                    (ClickState::Released { at_ms: now_ms }, None)
                }
            }

            (ClickState::Released { at_ms }, true) => {
                if now_ms.wrapping_sub(at_ms) < t.double_click_window_ms {
                    (ClickState::PressedAgain { since_ms: now_ms }, None)
                } else {
                    // The window ran out before anyone polled: the first
                    // click was a Short and this press starts a new gesture.
                    (
                        ClickState::Pressed { since_ms: now_ms },
                        Some(ClickKind::Short),
                    )
                }
            }

            (ClickState::PressedAgain { since_ms }, false) => {
                if now_ms.wrapping_sub(since_ms) >= t.long_press_ms {
                    (ClickState::Idle, Some(ClickKind::Long))
                } else {
                    (ClickState::Idle, Some(ClickKind::Double))
                }
            }

            (ClickState::LongHeld, false) => (ClickState::Idle, None),

            (state, pressed) => {
                debug!(
                    "click: out-of-order {} edge in {:?}",
                    if pressed { "press" } else { "release" },
                    state
                );
                return None;
            }
        };

        self.state = next;
        self.last_edge_ms = Some(now_ms);
        click
    }
}

// ── Per-button detector ───────────────────────────────────────

/// One classifier per known button id.
#[derive(Debug, Clone)]
pub struct ClickDetector {
    buttons: [ClickClassifier; BUTTON_COUNT],
}

impl ClickDetector {
    pub fn new(timing: ClickTiming) -> Self {
        Self {
            buttons: core::array::from_fn(|_| ClickClassifier::new(timing)),
        }
    }

    /// Edges for unknown button ids are absorbed.
    pub fn on_edge(&mut self, button: ButtonId, pressed: bool, now_ms: u32) -> Option<ClickEvent> {
        let Some(classifier) = self.buttons.get_mut(button as usize) else {
            debug!("click: edge from unknown button {}", button);
            return None;
        };
        classifier
            .on_edge(pressed, now_ms)
            .map(|kind| ClickEvent { button, kind })
    }

    /// Drop every gesture in progress. Used after edges were lost, so a
    /// missing release cannot turn into a Long.
    pub fn reset(&mut self) {
        for classifier in &mut self.buttons {
            classifier.reset();
        }
    }

    /// Poll every classifier, handing each resolved click to `sink`.
    pub fn poll(&mut self, now_ms: u32, mut sink: impl FnMut(ClickEvent)) {
        for (id, classifier) in self.buttons.iter_mut().enumerate() {
            if let Some(kind) = classifier.poll(now_ms) {
                sink(ClickEvent {
                    button: id as ButtonId,
                    kind,
                });
            }
        }
    }
}
