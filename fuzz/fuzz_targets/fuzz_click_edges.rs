//! Fuzz target: button edges → `InputHandler` → `DeviceStatus`
//!
//! Each 3-byte chunk is one event: `[key_id, flags, gap_lo]`. Bit 0 of
//! `flags` is the level, bit 1 turns the chunk into a timer poll instead
//! of an edge, and the gap (plus `flags >> 2` as high bits) advances the
//! clock.
//!
//! Invariants checked:
//! - No panics under any byte sequence, including clock wrap
//! - After a reset request, advertising and bonding intent are both clear
//!   until another click sets them
//!
//! cargo fuzz run fuzz_click_edges

#![no_main]

use bpslink::app::click::ClickTiming;
use bpslink::app::input::InputHandler;
use bpslink::events::DispatchEvent;
use bpslink::status::{DeviceStatus, StatusFlag};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());
    let mut now = u32::MAX - 10_000;

    for chunk in data.chunks_exact(3) {
        let (key_id, flags, gap_lo) = (chunk[0] % 4, chunk[1], chunk[2]);
        now = now.wrapping_add(u32::from(gap_lo) | (u32::from(flags >> 2) << 8));

        let reset_before = status.test(StatusFlag::ResetRequested);
        if flags & 0b10 != 0 {
            input.poll(now);
        } else {
            input.handle(DispatchEvent::ButtonEdge {
                key_id,
                pressed: flags & 1 != 0,
                at_ms: now,
            });
        }

        if !reset_before && status.test(StatusFlag::ResetRequested) {
            assert!(!status.test(StatusFlag::AdvertisingRequested));
            assert!(!status.test(StatusFlag::BondingRequested));
        }
    }
});
