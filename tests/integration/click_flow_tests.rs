//! Button edges → click classification → status register → radio.
//!
//! Drives an [`InputHandler`] with timestamped edges exactly as the input
//! task would, then lets the reconciler act on the result.

use bpslink::app::click::ClickTiming;
use bpslink::app::input::InputHandler;
use bpslink::app::reconcile::Reconciler;
use bpslink::events::DispatchEvent;
use bpslink::status::{DeviceStatus, StatusFlag};

use crate::mock_hw::{MockRadio, RadioCall};

const ADV: u8 = 0;
const AUX: u8 = 1;

fn edge(input: &mut InputHandler<'_>, key_id: u8, pressed: bool, at_ms: u32) {
    input.handle(DispatchEvent::ButtonEdge {
        key_id,
        pressed,
        at_ms,
    });
}

/// Press at `at_ms`, release `hold_ms` later.
fn tap(input: &mut InputHandler<'_>, key_id: u8, at_ms: u32, hold_ms: u32) {
    edge(input, key_id, true, at_ms);
    edge(input, key_id, false, at_ms + hold_ms);
}

/// One short click on the advertising button, resolved by the window poll.
/// Returns the time after it resolved.
fn short_click(input: &mut InputHandler<'_>, at_ms: u32) -> u32 {
    tap(input, ADV, at_ms, 100);
    let resolved = at_ms + 100 + ClickTiming::default().double_click_window_ms;
    input.poll(resolved);
    resolved
}

// ── Scenario: Short click starts advertising ──────────────────

#[test]
fn short_click_then_one_tick_starts_advertising() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    short_click(&mut input, 1_000);
    assert!(status.test(StatusFlag::AdvertisingRequested));
    assert!(!status.test(StatusFlag::AdvertisingActive));

    reconciler.tick(&mut radio);
    assert_eq!(radio.take_calls(), vec![RadioCall::StartAdvertising]);
    assert!(status.test(StatusFlag::AdvertisingActive));

    reconciler.tick(&mut radio);
    assert!(radio.calls.is_empty(), "converged state issues nothing");
}

#[test]
fn short_click_parity_decides_advertising() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());

    let mut t = 1_000;
    for n in 1..=5 {
        t = short_click(&mut input, t) + 50;
        assert_eq!(status.test(StatusFlag::AdvertisingRequested), n % 2 == 1);
    }
}

#[test]
fn second_short_click_stops_advertising() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    let t = short_click(&mut input, 1_000);
    reconciler.tick(&mut radio);
    short_click(&mut input, t + 500);
    reconciler.tick(&mut radio);

    assert_eq!(
        radio.take_calls(),
        vec![RadioCall::StartAdvertising, RadioCall::StopAdvertising]
    );
    assert!(!status.test(StatusFlag::AdvertisingActive));
}

// ── Scenario: Long click resets a bonded device ───────────────

#[test]
fn long_click_on_bonded_device_unpairs_and_stops_advertising() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    status.set(StatusFlag::AdvertisingActive);
    status.set(StatusFlag::BondingRequested);
    status.set(StatusFlag::Bonded);

    let mut input = InputHandler::new(&status, ClickTiming::default());
    let mut radio = MockRadio::with_stored_bonds(1);
    let mut reconciler = Reconciler::new(&status);

    edge(&mut input, ADV, true, 1_000);
    input.poll(3_999);
    assert!(!status.test(StatusFlag::ResetRequested), "not yet long");
    input.poll(4_000);

    assert!(status.test(StatusFlag::ResetRequested));
    assert!(!status.test(StatusFlag::AdvertisingRequested));
    assert!(!status.test(StatusFlag::BondingRequested));

    reconciler.tick(&mut radio);
    assert_eq!(
        radio.take_calls(),
        vec![RadioCall::StopAdvertising, RadioCall::Unpair]
    );
    assert!(!status.test(StatusFlag::Bonded));
    assert_eq!(radio.stored_bonds, 0);

    // Releasing after the long hold is not another click.
    edge(&mut input, ADV, false, 4_500);
    input.poll(5_000);
    assert!(!status.test(StatusFlag::AdvertisingRequested));
}

#[test]
fn release_after_long_threshold_also_resets() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    let mut input = InputHandler::new(&status, ClickTiming::default());

    // No poll in between: the release edge itself classifies the hold.
    tap(&mut input, ADV, 1_000, 3_200);

    assert!(status.test(StatusFlag::ResetRequested));
    assert!(!status.test(StatusFlag::AdvertisingRequested));
}

// ── Scenario: Double click toggles bonding only ───────────────

#[test]
fn double_click_toggles_bonding_without_touching_advertising() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    let mut input = InputHandler::new(&status, ClickTiming::default());

    tap(&mut input, ADV, 1_000, 100);
    tap(&mut input, ADV, 1_250, 100);

    assert!(status.test(StatusFlag::BondingRequested));
    assert!(status.test(StatusFlag::AdvertisingRequested));
    assert!(status.take_bond_hint(), "double click raises the LED hint");

    // Nothing left pending in the window.
    input.poll(5_000);
    assert!(status.test(StatusFlag::AdvertisingRequested));

    tap(&mut input, ADV, 6_000, 100);
    tap(&mut input, ADV, 6_200, 100);
    assert!(!status.test(StatusFlag::BondingRequested));
}

#[test]
fn withdrawing_bonding_unpairs_on_next_tick() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::BondingRequested);
    status.set(StatusFlag::Bonded);
    let mut input = InputHandler::new(&status, ClickTiming::default());
    let mut radio = MockRadio::with_stored_bonds(1);
    let mut reconciler = Reconciler::new(&status);

    reconciler.tick(&mut radio);
    assert!(radio.calls.is_empty(), "requested bond is kept");

    tap(&mut input, ADV, 1_000, 80);
    tap(&mut input, ADV, 1_200, 80);
    reconciler.tick(&mut radio);

    assert_eq!(radio.take_calls(), vec![RadioCall::Unpair]);
    assert!(!status.test(StatusFlag::Bonded));
}

// ── Scenario: strict double-click boundary ────────────────────

#[test]
fn second_press_one_ms_inside_window_is_double() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());

    // Release at 1100, second press 299 ms later.
    tap(&mut input, ADV, 1_000, 100);
    tap(&mut input, ADV, 1_399, 100);
    input.poll(5_000);

    assert!(status.test(StatusFlag::BondingRequested));
    assert!(!status.test(StatusFlag::AdvertisingRequested), "no Short emitted");
}

#[test]
fn second_press_exactly_at_window_is_two_shorts() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());

    // Release at 1100, second press 300 ms later.
    tap(&mut input, ADV, 1_000, 100);
    assert!(!status.test(StatusFlag::AdvertisingRequested));
    tap(&mut input, ADV, 1_400, 100);
    assert!(
        status.test(StatusFlag::AdvertisingRequested),
        "first Short emitted by the late press"
    );
    input.poll(1_800);

    assert!(!status.test(StatusFlag::AdvertisingRequested), "two toggles");
    assert!(!status.test(StatusFlag::BondingRequested));
}

// ── Noise and other buttons ───────────────────────────────────

#[test]
fn contact_bounce_inside_debounce_is_absorbed() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());

    edge(&mut input, ADV, true, 1_000);
    edge(&mut input, ADV, false, 1_005);
    edge(&mut input, ADV, true, 1_010);
    edge(&mut input, ADV, false, 1_120);
    input.poll(1_420);

    assert!(status.test(StatusFlag::AdvertisingRequested), "one Short");
    assert!(!status.test(StatusFlag::BondingRequested));
}

#[test]
fn tap_shorter_than_debounce_is_a_short_not_a_reset() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    status.set(StatusFlag::BondingRequested);
    status.set(StatusFlag::Bonded);
    let mut input = InputHandler::new(&status, ClickTiming::default());
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    // Released 20 ms after the press, inside the 30 ms debounce interval.
    tap(&mut input, ADV, 1_000, 20);
    for now in (1_010..=4_500).step_by(10) {
        input.poll(now);
        reconciler.tick(&mut radio);
    }

    assert!(!status.test(StatusFlag::ResetRequested));
    assert!(status.test(StatusFlag::Bonded), "no unpair");
    assert!(!status.test(StatusFlag::AdvertisingRequested), "Short toggled it off");
    assert!(!radio.calls.contains(&RadioCall::Unpair));
}

#[test]
fn auxiliary_button_clicks_change_nothing() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());

    tap(&mut input, AUX, 1_000, 100);
    input.poll(1_500);
    tap(&mut input, AUX, 2_000, 80);
    tap(&mut input, AUX, 2_200, 80);
    edge(&mut input, AUX, true, 3_000);
    input.poll(7_000);

    assert_eq!(status.snapshot().raw(), 0);
}

#[test]
fn unknown_button_id_is_ignored() {
    let status = DeviceStatus::new();
    let mut input = InputHandler::new(&status, ClickTiming::default());

    tap(&mut input, 7, 1_000, 100);
    input.poll(2_000);

    assert_eq!(status.snapshot().raw(), 0);
}
