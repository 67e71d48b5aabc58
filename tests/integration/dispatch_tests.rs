//! Button ISR → dispatch queue → input handler.
//!
//! The dispatch queue is process-global, so everything touching it lives
//! in this one test.

use bpslink::app::click::ClickTiming;
use bpslink::app::input::InputHandler;
use bpslink::drivers::button::{button_isr_handler, dropped_edges};
use bpslink::events::{DispatchEvent, ModuleId, drain_events, push_event, queue_len};
use bpslink::status::{DeviceStatus, StatusFlag};

#[test]
fn isr_edges_reach_the_status_register_and_overflow_is_counted() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());
    drain_events(|_| {});

    // Boot announcements are consumed without side effects.
    assert!(push_event(DispatchEvent::ModuleReady(ModuleId::Leds)));
    assert!(push_event(DispatchEvent::ModuleReady(ModuleId::Radio)));

    // Double click, as the GPIO ISR would report it.
    button_isr_handler(0, true, 1_000);
    button_isr_handler(0, false, 1_100);
    button_isr_handler(0, true, 1_200);
    button_isr_handler(0, false, 1_300);
    assert_eq!(queue_len(), 6);

    let mut seen = Vec::new();
    drain_events(|event| {
        seen.push(event);
        input.handle(event);
    });
    assert_eq!(seen.len(), 6);
    assert_eq!(seen[0], DispatchEvent::ModuleReady(ModuleId::Leds));
    assert!(status.test(StatusFlag::BondingRequested));
    assert!(!status.test(StatusFlag::AdvertisingRequested));
    assert_eq!(queue_len(), 0);

    // A burst larger than the queue drops the excess and counts it.
    let before = dropped_edges();
    for i in 0..20u32 {
        button_isr_handler(1, i % 2 == 0, 5_000 + i * 50);
    }
    assert_eq!(queue_len(), 16);
    assert_eq!(dropped_edges() - before, 4);

    drain_events(|event| input.handle(event));
    assert_eq!(queue_len(), 0);
}
