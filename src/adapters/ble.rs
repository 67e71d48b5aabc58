//! BLE radio adapter.
//!
//! Implements [`RadioPort`] and forwards stack callbacks to the registered
//! [`LinkObserver`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid via the raw `esp_idf_svc::sys` API.
//! - **all other targets**: simulation backend for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Attribute                   | UUID     | Perms          |
//! |-----------------------------|----------|----------------|
//! | Blood Pressure service      | `0x1810` | primary        |
//! | Blood Pressure Measurement  | `0x2A35` | Notify         |
//! | └ Client Characteristic Cfg | `0x2902` | Read+Write     |
//!
//! Advertising stops on its own when a central connects; the adapter
//! restarts it on disconnect if it was last asked to advertise.

use heapless::{String, Vec};
use log::info;

use crate::app::ports::{LinkObserver, PeerAddress, RadioPort};
use crate::error::{Error, RadioError};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const BPS_SERVICE_UUID: u16 = 0x1810;
pub const BPS_MEASUREMENT_UUID: u16 = 0x2A35;
pub const CCC_DESCRIPTOR_UUID: u16 = 0x2902;

/// GAP appearance: generic blood pressure.
pub const APPEARANCE_BLOOD_PRESSURE: u16 = 0x0380;

const MAX_ADV_LEN: usize = 31;
const MAX_NAME_LEN: usize = 24;

// AD types
const AD_FLAGS: u8 = 0x01;
const AD_UUID16_ALL: u8 = 0x03;
const AD_NAME_SHORT: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;
const AD_APPEARANCE: u8 = 0x19;
/// LE General Discoverable, BR/EDR not supported.
const AD_FLAGS_VALUE: u8 = 0x06;

/// Raw advertising payload: flags, BPS service UUID, appearance, then as
/// much of the name as fits (shortened-name AD type when truncated).
pub fn build_adv_payload(name: &str) -> Vec<u8, MAX_ADV_LEN> {
    let mut adv = Vec::new();
    let [svc0, svc1] = BPS_SERVICE_UUID.to_le_bytes();
    let [app0, app1] = APPEARANCE_BLOOD_PRESSURE.to_le_bytes();
    let fixed = [
        0x02, AD_FLAGS, AD_FLAGS_VALUE,
        0x03, AD_UUID16_ALL, svc0, svc1,
        0x03, AD_APPEARANCE, app0, app1,
    ];
    // The fixed part is 11 bytes; the name gets whatever is left.
    let _ = adv.extend_from_slice(&fixed);

    let room = MAX_ADV_LEN - adv.len() - 2;
    let bytes = name.as_bytes();
    let (ad_type, name_bytes) = if bytes.len() > room {
        (AD_NAME_SHORT, &bytes[..room])
    } else {
        (AD_NAME_COMPLETE, bytes)
    };
    if !name_bytes.is_empty() {
        let _ = adv.push(name_bytes.len() as u8 + 1);
        let _ = adv.push(ad_type);
        let _ = adv.extend_from_slice(name_bytes);
    }
    adv
}

// ── ESP-IDF BLE static state (ISR-safe atomics) ───────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
static OBSERVER: std::sync::OnceLock<&'static dyn LinkObserver> = std::sync::OnceLock::new();

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONNECTED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_MEASUREMENT_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CCC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_ADV_DATA_READY: AtomicBool = AtomicBool::new(false);
/// Last advertising directive: true after start, false after stop.
#[cfg(target_os = "espidf")]
static BLE_ADV_WANTED: AtomicBool = AtomicBool::new(false);

#[cfg(target_os = "espidf")]
const MAX_BONDS: usize = 8;

#[cfg(target_os = "espidf")]
fn observer() -> Option<&'static dyn LinkObserver> {
    OBSERVER.get().copied()
}

#[cfg(target_os = "espidf")]
fn uuid16_to_esp(uuid: u16) -> esp_idf_svc::sys::esp_bt_uuid_t {
    // SAFETY: `esp_bt_uuid_t` is a bindgen C struct of integers and a byte
    // union; all-zero is a valid value.
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

#[cfg(target_os = "espidf")]
fn adv_params() -> esp_idf_svc::sys::esp_ble_adv_params_t {
    use esp_idf_svc::sys::*;
    esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        // SAFETY: `esp_ble_adv_params_t` is plain C data (integers and a
        // byte array); zero fills the peer address and reserved fields.
        ..unsafe { core::mem::zeroed() }
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_RAW_SET_COMPLETE_EVT => {
            BLE_ADV_DATA_READY.store(true, AtomicOrdering::Release);
            log::info!("BLE GAP: advertising data configured");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            let status = unsafe { (*param).adv_start_cmpl.status };
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::info!("BLE GAP: advertising started");
            } else {
                log::warn!("BLE GAP: advertising start failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SEC_REQ_EVT => unsafe {
            esp_ble_gap_security_rsp((*param).ble_security.ble_req.bd_addr.as_mut_ptr(), true);
        },
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_AUTH_CMPL_EVT => {
            let p = unsafe { &(*param).ble_security.auth_cmpl };
            if p.success {
                let bonded = p.auth_mode as u32 & ESP_LE_AUTH_BOND != 0;
                if let Some(obs) = observer() {
                    obs.on_pairing_complete(PeerAddress(p.bd_addr), bonded);
                }
            } else {
                log::warn!("BLE GAP: authentication failed (reason={})", p.fail_reason);
            }
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid16_to_esp(BPS_SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 4) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            let mut char_uuid = uuid16_to_esp(BPS_MEASUREMENT_UUID);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                esp_ble_gatts_add_char(
                    svc_handle,
                    &mut char_uuid,
                    0,
                    ESP_GATT_CHAR_PROP_BIT_NOTIFY as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            BLE_MEASUREMENT_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: measurement char (handle={})", handle);
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            let mut ccc_uuid = uuid16_to_esp(CCC_DESCRIPTOR_UUID);
            unsafe {
                esp_ble_gatts_add_char_descr(
                    svc_handle,
                    &mut ccc_uuid,
                    (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let handle = unsafe { (*param).add_char_descr.attr_handle };
            BLE_CCC_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: CCC descriptor (handle={})", handle);
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            BLE_CONN_ID.store(p.conn_id as u32, AtomicOrdering::Relaxed);
            BLE_CONNECTED.store(true, AtomicOrdering::Release);
            if let Some(obs) = observer() {
                obs.on_connected(PeerAddress(p.remote_bda));
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let reason = unsafe { (*param).disconnect.reason };
            BLE_CONNECTED.store(false, AtomicOrdering::Release);
            if let Some(obs) = observer() {
                obs.on_disconnected(reason as u8);
            }
            if BLE_ADV_WANTED.load(AtomicOrdering::Acquire) {
                let mut params = adv_params();
                unsafe { esp_ble_gap_start_advertising(&mut params) };
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if p.handle as u32 == BLE_CCC_HANDLE.load(AtomicOrdering::Relaxed) && p.len >= 2 {
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                let ccc = u16::from_le_bytes([data[0], data[1]]);
                if let Some(obs) = observer() {
                    obs.on_subscription_changed(ccc & 0x0001 != 0);
                }
            }
            if p.need_rsp {
                unsafe {
                    esp_ble_gatts_send_response(
                        gatts_if,
                        p.conn_id,
                        p.trans_id,
                        esp_gatt_status_t_ESP_GATT_OK,
                        core::ptr::null_mut(),
                    );
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimLink {
    observer: Option<&'static dyn LinkObserver>,
    advertising: bool,
    connected: bool,
    subscribed: bool,
    bonds: usize,
    notifications: usize,
}

pub struct BleRadio {
    device_name: String<MAX_NAME_LEN>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

impl BleRadio {
    /// Bring up the BLE stack and register the GATT service. Advertising
    /// does not start until the reconciler asks for it.
    pub fn new(device_name: &str) -> Result<Self, Error> {
        let mut name = String::new();
        for c in device_name.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        let mut radio = Self {
            device_name: name,
            #[cfg(not(target_os = "espidf"))]
            sim: SimLink::default(),
        };
        radio.platform_init()?;
        Ok(radio)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Route stack callbacks to `observer`. Only the first call takes effect.
    pub fn attach_observer(&mut self, observer: &'static dyn LinkObserver) {
        #[cfg(target_os = "espidf")]
        if OBSERVER.set(observer).is_err() {
            warn!("BLE: link observer already attached");
        }
        #[cfg(not(target_os = "espidf"))]
        if self.sim.observer.is_none() {
            self.sim.observer = Some(observer);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<(), Error> {
        use esp_idf_svc::sys::*;
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            if esp_bt_controller_init(&mut bt_cfg) != ESP_OK {
                return Err(Error::Init("bt_controller_init"));
            }
            if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK {
                return Err(Error::Init("bt_controller_enable"));
            }
            if esp_bluedroid_init() != ESP_OK {
                return Err(Error::Init("bluedroid_init"));
            }
            if esp_bluedroid_enable() != ESP_OK {
                return Err(Error::Init("bluedroid_enable"));
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            // Just-works pairing with bonding.
            let auth_req = esp_ble_auth_req_t_ESP_LE_AUTH_REQ_SC_BOND;
            let iocap = esp_ble_io_cap_t_ESP_IO_CAP_NONE;
            let key_size: u8 = 16;
            let init_key: u8 = (ESP_BLE_ENC_KEY_MASK | ESP_BLE_ID_KEY_MASK) as u8;
            let rsp_key: u8 = (ESP_BLE_ENC_KEY_MASK | ESP_BLE_ID_KEY_MASK) as u8;
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_AUTHEN_REQ_MODE,
                &auth_req as *const _ as *mut _,
                core::mem::size_of_val(&auth_req) as u8,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_IOCAP_MODE,
                &iocap as *const _ as *mut _,
                core::mem::size_of_val(&iocap) as u8,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_MAX_KEY_SIZE,
                &key_size as *const _ as *mut _,
                1,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_SET_INIT_KEY,
                &init_key as *const _ as *mut _,
                1,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_SET_RSP_KEY,
                &rsp_key as *const _ as *mut _,
                1,
            );

            let mut cname: Vec<u8, { MAX_NAME_LEN + 1 }> = Vec::new();
            let _ = cname.extend_from_slice(self.device_name.as_bytes());
            let _ = cname.push(0);
            esp_ble_gap_set_device_name(cname.as_ptr() as *const _);

            let mut adv = build_adv_payload(&self.device_name);
            let ret = esp_ble_gap_config_adv_data_raw(adv.as_mut_ptr(), adv.len() as u32);
            if ret != ESP_OK {
                return Err(Error::Init("config_adv_data_raw"));
            }
        }
        info!("BLE(espidf): Bluedroid stack initialised as '{}'", self.device_name);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<(), Error> {
        info!(
            "BLE(sim): stack ready as '{}' (service {:04x})",
            self.device_name, BPS_SERVICE_UUID
        );
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// RadioPort implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl RadioPort for BleRadio {
    fn start_advertising(&mut self) -> Result<(), RadioError> {
        if !BLE_ADV_DATA_READY.load(AtomicOrdering::Acquire) {
            return Err(RadioError::NotReady);
        }
        let mut params = adv_params();
        let ret = unsafe { esp_idf_svc::sys::esp_ble_gap_start_advertising(&mut params) };
        if ret != esp_idf_svc::sys::ESP_OK {
            return Err(RadioError::AdvertisingStart(ret));
        }
        BLE_ADV_WANTED.store(true, AtomicOrdering::Release);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), RadioError> {
        BLE_ADV_WANTED.store(false, AtomicOrdering::Release);
        let ret = unsafe { esp_idf_svc::sys::esp_ble_gap_stop_advertising() };
        if ret != esp_idf_svc::sys::ESP_OK {
            return Err(RadioError::AdvertisingStop(ret));
        }
        Ok(())
    }

    fn unpair(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        // SAFETY: `esp_ble_bond_dev_t` holds only integer arrays and unions
        // of them; an all-zero list is valid and the stack overwrites it.
        let mut list: [esp_ble_bond_dev_t; MAX_BONDS] = unsafe { core::mem::zeroed() };
        let mut count = MAX_BONDS as i32;
        let ret = unsafe { esp_ble_get_bond_device_list(&mut count, list.as_mut_ptr()) };
        if ret != ESP_OK {
            return Err(RadioError::Unpair(ret));
        }
        for dev in list.iter_mut().take(count.max(0) as usize) {
            let ret = unsafe { esp_ble_remove_bond_device(dev.bd_addr.as_mut_ptr()) };
            if ret != ESP_OK {
                return Err(RadioError::Unpair(ret));
            }
        }
        Ok(())
    }

    fn notify_measurement(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        let handle = BLE_MEASUREMENT_HANDLE.load(AtomicOrdering::Relaxed);
        if handle == 0 || !BLE_CONNECTED.load(AtomicOrdering::Acquire) {
            return Err(RadioError::NotReady);
        }
        // The stack copies the value; the pointer only has to live for the call.
        let ret = unsafe {
            esp_idf_svc::sys::esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as u8,
                BLE_CONN_ID.load(AtomicOrdering::Relaxed) as u16,
                handle as u16,
                payload.len() as u16,
                payload.as_ptr() as *mut u8,
                false,
            )
        };
        if ret != esp_idf_svc::sys::ESP_OK {
            return Err(RadioError::Notify(ret));
        }
        Ok(())
    }

    fn stored_bond_count(&self) -> usize {
        let n = unsafe { esp_idf_svc::sys::esp_ble_get_bond_device_num() };
        n.max(0) as usize
    }
}

#[cfg(not(target_os = "espidf"))]
impl RadioPort for BleRadio {
    fn start_advertising(&mut self) -> Result<(), RadioError> {
        self.sim.advertising = true;
        info!("BLE(sim): advertising '{}'", self.device_name);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), RadioError> {
        self.sim.advertising = false;
        info!("BLE(sim): advertising stopped");
        Ok(())
    }

    fn unpair(&mut self) -> Result<(), RadioError> {
        info!("BLE(sim): removed {} bond(s)", self.sim.bonds);
        self.sim.bonds = 0;
        Ok(())
    }

    fn notify_measurement(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if !self.sim.connected || !self.sim.subscribed {
            return Err(RadioError::NotReady);
        }
        self.sim.notifications += 1;
        info!("BLE(sim): notified {} bytes", payload.len());
        Ok(())
    }

    fn stored_bond_count(&self) -> usize {
        self.sim.bonds
    }
}

// ── Simulation hooks ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl BleRadio {
    pub fn sim_is_advertising(&self) -> bool {
        self.sim.advertising
    }

    pub fn sim_notifications(&self) -> usize {
        self.sim.notifications
    }

    pub fn sim_set_stored_bonds(&mut self, bonds: usize) {
        self.sim.bonds = bonds;
    }

    /// A central connects; advertising stops as it would on the real stack.
    pub fn sim_connect(&mut self, peer: PeerAddress) {
        self.sim.connected = true;
        self.sim.advertising = false;
        if let Some(obs) = self.sim.observer {
            obs.on_connected(peer);
        }
    }

    pub fn sim_pair(&mut self, peer: PeerAddress, bonded: bool) {
        if bonded {
            self.sim.bonds += 1;
        }
        if let Some(obs) = self.sim.observer {
            obs.on_pairing_complete(peer, bonded);
        }
    }

    pub fn sim_subscribe(&mut self, enabled: bool) {
        self.sim.subscribed = enabled;
        if let Some(obs) = self.sim.observer {
            obs.on_subscription_changed(enabled);
        }
    }

    pub fn sim_disconnect(&mut self, reason: u8) {
        self.sim.connected = false;
        self.sim.subscribed = false;
        if let Some(obs) = self.sim.observer {
            obs.on_disconnected(reason);
        }
    }
}
