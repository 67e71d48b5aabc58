//! Interrupt-fed dispatch queue.
//!
//! Events are produced by:
//! - GPIO ISRs (button press and release edges)
//! - Bootstrap code (module-ready notifications)
//!
//! Events are consumed by the input task, which drains them in FIFO order
//! each tick and feeds them to the [`InputHandler`](crate::app::input::InputHandler).
//!
//! The queue is a lock-free `heapless::mpmc::Q16`: enqueue is a CAS on the
//! write index, so a GPIO ISR can push while the bootstrap thread pushes
//! and the input task pops. No lock is ever taken.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ Button ISR  │────▶│  DISPATCH_QUEUE  │────▶│  Input task  │
//! │ Bootstrap   │────▶│  (mpmc, 16 deep) │     │  (consumer)  │
//! └─────────────┘     └──────────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

use heapless::mpmc::Q16;

use crate::app::click::ButtonId;

/// Maximum number of pending events.
pub const DISPATCH_DEPTH: usize = 16;

/// Subsystems that announce readiness on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleId {
    Leds,
    Buttons,
    Radio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Raw button edge, timestamped in the ISR.
    ButtonEdge {
        key_id: ButtonId,
        pressed: bool,
        at_ms: u32,
    },
    /// A subsystem finished initialising.
    ModuleReady(ModuleId),
}

static DISPATCH_QUEUE: Q16<DispatchEvent> = Q16::new();

// Raised before an event becomes visible and lowered after it is taken,
// so it never undercounts.
static PENDING: AtomicUsize = AtomicUsize::new(0);

/// Push an event into the queue.
/// Lock-free; safe to call from ISR context.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: DispatchEvent) -> bool {
    PENDING.fetch_add(1, Ordering::AcqRel);
    if DISPATCH_QUEUE.enqueue(event).is_ok() {
        true
    } else {
        PENDING.fetch_sub(1, Ordering::AcqRel);
        false
    }
}

/// Pop the next event. Returns `None` if the queue is empty.
pub fn pop_event() -> Option<DispatchEvent> {
    let event = DISPATCH_QUEUE.dequeue()?;
    PENDING.fetch_sub(1, Ordering::AcqRel);
    Some(event)
}

/// Drain all pending events into a callback, in FIFO order.
pub fn drain_events(mut handler: impl FnMut(DispatchEvent)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Number of pending events. Exact when no push is in flight.
pub fn queue_len() -> usize {
    PENDING.load(Ordering::Acquire)
}
