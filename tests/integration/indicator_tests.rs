//! Indicator scheduler against the recording LED bank.
//!
//! Ticks are driven at the default 100 ms task period; phase A runs on
//! odd multiples (100, 300, ...) and phase B on even ones.

use bpslink::app::indicator::{IndicatorScheduler, IndicatorTiming, ResetFlash};
use bpslink::app::ports::{LedId, LinkObserver, PeerAddress};
use bpslink::status::{DeviceStatus, StatusFlag};

use crate::mock_hw::{LedCall, MockLeds};

const PERIOD_MS: u32 = 100;

/// Tick from `from_ms` to `to_ms` inclusive, returning any reset flash.
fn run(
    sched: &mut IndicatorScheduler<'_>,
    leds: &mut MockLeds,
    from_ms: u32,
    to_ms: u32,
) -> Option<ResetFlash> {
    let mut flash = None;
    let mut t = from_ms;
    while t <= to_ms {
        if let Some(f) = sched.tick(t, leds) {
            flash = Some(f);
        }
        t += PERIOD_MS;
    }
    flash
}

#[test]
fn heartbeat_runs_fast_while_advertising_requested() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);

    run(&mut sched, &mut leds, 100, 900);

    // Elapsed must exceed 300: toggles at 500 and 900.
    assert_eq!(leds.toggles(LedId::Heartbeat), 2);
}

#[test]
fn heartbeat_runs_slow_otherwise() {
    let status = DeviceStatus::new();
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);

    run(&mut sched, &mut leds, 100, 1_500);
    assert_eq!(leds.toggles(LedId::Heartbeat), 0);

    run(&mut sched, &mut leds, 1_600, 1_700);
    assert_eq!(leds.toggles(LedId::Heartbeat), 1);
}

#[test]
fn advertising_unbonded_holds_blue_on_until_stopped() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);

    run(&mut sched, &mut leds, 100, 400);
    assert!(leds.is_on(LedId::Blue));
    let sets = leds
        .calls
        .iter()
        .filter(|c| **c == LedCall::Set(LedId::Blue, true))
        .count();
    assert_eq!(sets, 1, "level written once, not every tick");

    status.clear(StatusFlag::AdvertisingRequested);
    run(&mut sched, &mut leds, 500, 600);
    assert!(!leds.is_on(LedId::Blue));
}

#[test]
fn bonded_unconnected_blinks_blue_with_heartbeat() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::Bonded);
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);

    run(&mut sched, &mut leds, 100, 3_500);

    assert_eq!(leds.toggles(LedId::Heartbeat), 2);
    assert_eq!(leds.toggles(LedId::Blue), 2);
}

#[test]
fn connection_lights_red_and_clears_blue() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);
    let peer = PeerAddress([1, 2, 3, 4, 5, 6]);

    run(&mut sched, &mut leds, 100, 100);
    assert!(leds.is_on(LedId::Blue));

    status.on_connected(peer);
    run(&mut sched, &mut leds, 200, 200);
    assert!(leds.is_on(LedId::Red));
    assert!(!leds.is_on(LedId::Blue));

    status.on_disconnected(0x13);
    run(&mut sched, &mut leds, 300, 400);
    assert!(!leds.is_on(LedId::Red));
    assert!(leds.is_on(LedId::Blue), "still advertising unbonded");
}

#[test]
fn bond_hint_forces_blue_on_for_bonded_device() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::Bonded);
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);

    status.raise_bond_hint();
    run(&mut sched, &mut leds, 100, 100);

    assert!(leds.is_on(LedId::Blue));
    assert!(!status.take_bond_hint(), "hint consumed");
}

// ── Reset flash ───────────────────────────────────────────────

#[test]
fn reset_flash_holds_request_until_dwell_completes() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    status.set(StatusFlag::Bonded);
    let mut leds = MockLeds::new();
    let timing = IndicatorTiming::default();
    let mut sched = IndicatorScheduler::new(&status, timing, 0);

    run(&mut sched, &mut leds, 100, 400);
    status.request_reset();

    // Phase A first: no flash yet.
    assert_eq!(run(&mut sched, &mut leds, 500, 500), None);
    let flash = run(&mut sched, &mut leds, 600, 600);

    assert_eq!(flash, Some(ResetFlash { dwell_ms: timing.reset_dwell_ms }));
    assert!(leds.all_on());
    assert!(
        status.test(StatusFlag::ResetRequested),
        "flag stays raised through the dwell"
    );

    sched.finish_reset_flash(600 + timing.reset_dwell_ms, &mut leds);

    assert!(leds.all_off());
    assert!(!status.test(StatusFlag::ResetRequested));
}

#[test]
fn after_reset_flash_heartbeat_restarts_from_dwell_end() {
    let status = DeviceStatus::new();
    let mut leds = MockLeds::new();
    let mut sched = IndicatorScheduler::new(&status, IndicatorTiming::default(), 0);

    status.request_reset();
    let flash = run(&mut sched, &mut leds, 100, 200);
    assert!(flash.is_some());
    sched.finish_reset_flash(2_200, &mut leds);
    leds.clear_calls();

    // Slow period counts from 2200: nothing through 3700, toggle at 3900.
    run(&mut sched, &mut leds, 2_300, 3_700);
    assert_eq!(leds.toggles(LedId::Heartbeat), 0);
    run(&mut sched, &mut leds, 3_800, 3_900);
    assert_eq!(leds.toggles(LedId::Heartbeat), 1);
}
