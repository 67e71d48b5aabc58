//! Reconciler against the recording radio: convergence, retries,
//! notification edges, boot policy and stack callbacks.

use bpslink::app::boot::apply_boot_policy;
use bpslink::app::ports::{LinkObserver, PeerAddress};
use bpslink::app::reconcile::Reconciler;
use bpslink::config::DeviceConfig;
use bpslink::measurement::BloodPressureMeasurement;
use bpslink::status::{DeviceStatus, StatusFlag};

use crate::mock_hw::{MockRadio, RadioCall};

const PEER: PeerAddress = PeerAddress([0xC0, 0xFF, 0xEE, 0x00, 0x11, 0x22]);

/// Bonded central connected and subscribed to measurements.
fn link_up(status: &DeviceStatus) {
    status.on_connected(PEER);
    status.on_pairing_complete(PEER, true);
    status.on_subscription_changed(true);
}

// ── Convergence ───────────────────────────────────────────────

#[test]
fn every_flag_combination_converges_in_one_tick() {
    for bits in 0u8..16 {
        let status = DeviceStatus::new();
        let adv_req = bits & 1 != 0;
        let adv_act = bits & 2 != 0;
        let bond_req = bits & 4 != 0;
        let bonded = bits & 8 != 0;
        if adv_req {
            status.set(StatusFlag::AdvertisingRequested);
        }
        if adv_act {
            status.set(StatusFlag::AdvertisingActive);
        }
        if bond_req {
            status.set(StatusFlag::BondingRequested);
        }
        if bonded {
            status.set(StatusFlag::Bonded);
        }

        let mut radio = MockRadio::new();
        let mut reconciler = Reconciler::new(&status);
        reconciler.tick(&mut radio);

        assert_eq!(
            status.test(StatusFlag::AdvertisingActive),
            adv_req,
            "bits={bits:04b}"
        );
        if !bond_req {
            assert!(!status.test(StatusFlag::Bonded), "bits={bits:04b}");
        }

        let expected = usize::from(adv_req != adv_act) + usize::from(!bond_req && bonded);
        assert_eq!(radio.calls.len(), expected, "bits={bits:04b}");

        radio.take_calls();
        reconciler.tick(&mut radio);
        assert!(radio.calls.is_empty(), "second tick is silent, bits={bits:04b}");
    }
}

#[test]
fn failed_start_is_retried_next_tick() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::AdvertisingRequested);
    let mut radio = MockRadio::new();
    radio.fail_next(RadioCall::StartAdvertising);
    let mut reconciler = Reconciler::new(&status);

    reconciler.tick(&mut radio);
    assert!(!status.test(StatusFlag::AdvertisingActive));

    reconciler.tick(&mut radio);
    assert!(status.test(StatusFlag::AdvertisingActive));
    assert_eq!(radio.count(RadioCall::StartAdvertising), 2);
}

#[test]
fn failed_unpair_keeps_bonded_until_it_succeeds() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::Bonded);
    let mut radio = MockRadio::with_stored_bonds(1);
    radio.fail_next(RadioCall::Unpair);
    let mut reconciler = Reconciler::new(&status);

    reconciler.tick(&mut radio);
    assert!(status.test(StatusFlag::Bonded));
    assert_eq!(radio.stored_bonds, 1);

    reconciler.tick(&mut radio);
    assert!(!status.test(StatusFlag::Bonded));
    assert_eq!(radio.count(RadioCall::Unpair), 2);
}

#[test]
fn intent_flipped_back_before_tick_issues_nothing() {
    let status = DeviceStatus::new();
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    status.toggle(StatusFlag::AdvertisingRequested);
    status.toggle(StatusFlag::AdvertisingRequested);
    reconciler.tick(&mut radio);

    assert!(radio.calls.is_empty());
}

// ── Measurement notification ──────────────────────────────────

#[test]
fn subscribed_bonded_peer_gets_one_notification() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::BondingRequested);
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    link_up(&status);
    for _ in 0..5 {
        reconciler.tick(&mut radio);
    }

    assert_eq!(radio.count(RadioCall::Notify { len: 0 }), 1);
    let expected = BloodPressureMeasurement::sample().encode();
    assert_eq!(radio.last_payload, expected.as_slice());
    assert_eq!(radio.last_payload.len(), 19);
}

#[test]
fn resubscribing_sends_the_measurement_again() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::BondingRequested);
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    link_up(&status);
    reconciler.tick(&mut radio);
    status.on_subscription_changed(false);
    reconciler.tick(&mut radio);
    status.on_subscription_changed(true);
    reconciler.tick(&mut radio);

    assert_eq!(radio.count(RadioCall::Notify { len: 0 }), 2);
}

#[test]
fn failed_notification_is_retried() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::BondingRequested);
    let mut radio = MockRadio::new();
    radio.fail_next(RadioCall::Notify { len: 0 });
    let mut reconciler = Reconciler::new(&status);

    link_up(&status);
    reconciler.tick(&mut radio);
    reconciler.tick(&mut radio);
    reconciler.tick(&mut radio);

    assert_eq!(radio.count(RadioCall::Notify { len: 0 }), 2);
}

#[test]
fn unbonded_subscriber_is_not_notified() {
    let status = DeviceStatus::new();
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    status.on_connected(PEER);
    status.on_pairing_complete(PEER, false);
    status.on_subscription_changed(true);
    reconciler.tick(&mut radio);

    assert!(!status.test(StatusFlag::Bonded));
    assert_eq!(radio.count(RadioCall::Notify { len: 0 }), 0);
}

// ── Stack callbacks ───────────────────────────────────────────

#[test]
fn disconnect_drops_connection_and_subscription() {
    let status = DeviceStatus::new();
    status.set(StatusFlag::BondingRequested);
    link_up(&status);

    status.on_disconnected(0x13);

    assert!(!status.test(StatusFlag::Connected));
    assert!(!status.test(StatusFlag::Subscribed));
    assert!(status.test(StatusFlag::Bonded), "bond survives disconnect");
}

#[test]
fn pairing_while_bonding_withdrawn_is_unpaired_next_tick() {
    let status = DeviceStatus::new();
    let mut radio = MockRadio::new();
    let mut reconciler = Reconciler::new(&status);

    status.on_connected(PEER);
    status.on_pairing_complete(PEER, true);
    reconciler.tick(&mut radio);

    assert_eq!(radio.take_calls(), vec![RadioCall::Unpair]);
    assert!(!status.test(StatusFlag::Bonded));
}

// ── Boot policy ───────────────────────────────────────────────

#[test]
fn default_boot_advertises_and_keeps_stored_bond() {
    let status = DeviceStatus::new();
    let mut radio = MockRadio::with_stored_bonds(1);
    apply_boot_policy(&status, &DeviceConfig::default(), &radio);

    let mut reconciler = Reconciler::new(&status);
    reconciler.tick(&mut radio);

    assert_eq!(radio.take_calls(), vec![RadioCall::StartAdvertising]);
    assert!(status.test(StatusFlag::Bonded));
    assert_eq!(radio.stored_bonds, 1);
}

#[test]
fn boot_without_keep_bond_removes_stored_bond() {
    let status = DeviceStatus::new();
    let config = DeviceConfig {
        advertise_on_boot: false,
        keep_stored_bond: false,
        ..DeviceConfig::default()
    };
    let mut radio = MockRadio::with_stored_bonds(2);
    apply_boot_policy(&status, &config, &radio);

    let mut reconciler = Reconciler::new(&status);
    reconciler.tick(&mut radio);

    assert_eq!(radio.take_calls(), vec![RadioCall::Unpair]);
    assert_eq!(radio.stored_bonds, 0);
    assert!(!status.test(StatusFlag::AdvertisingRequested));
}
