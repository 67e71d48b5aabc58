//! Button edge capture.
//!
//! ## Hardware
//!
//! Active-low momentary switches with the internal pull-up enabled. Each
//! GPIO fires on any edge; the ISR reads the level, timestamps it and pushes
//! a [`DispatchEvent::ButtonEdge`] onto the dispatch queue. All gesture
//! logic runs later in the input task.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::app::click::ButtonId;
use crate::events::{DispatchEvent, push_event};

/// Edges lost because the dispatch queue was full.
static DROPPED_EDGES: AtomicU32 = AtomicU32::new(0);

/// ISR body, shared by every button GPIO.
/// Safe to call from interrupt context (lock-free, never blocks).
pub fn button_isr_handler(key_id: ButtonId, pressed: bool, now_ms: u32) {
    let queued = push_event(DispatchEvent::ButtonEdge {
        key_id,
        pressed,
        at_ms: now_ms,
    });
    if !queued {
        DROPPED_EDGES.fetch_add(1, Ordering::Relaxed);
    }
}

/// Edges dropped since boot. Logged by the input task.
pub fn dropped_edges() -> u32 {
    DROPPED_EDGES.load(Ordering::Relaxed)
}

// ── GPIO ISR wiring ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    // The handler argument carries the button index, not a pointer.
    let key_id = arg as usize as ButtonId;
    let gpio = crate::pins::BUTTON_GPIOS[key_id as usize];
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let pressed = unsafe { gpio_get_level(gpio) } == 0;
    button_isr_handler(key_id, pressed, crate::adapters::time::isr_now_ms());
}

/// Configure every button GPIO as a pulled-up input and register the
/// any-edge ISR. Call once from `main()` before the runtime starts.
#[cfg(target_os = "espidf")]
pub fn init_buttons() -> crate::error::Result<()> {
    use crate::error::Error;
    // SAFETY: called once from main() before any ISR can fire. The
    // handler only pushes to the dispatch queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(Error::Init("gpio_install_isr_service"));
        }

        for (key_id, &gpio) in crate::pins::BUTTON_GPIOS.iter().enumerate() {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << gpio,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
            };
            if gpio_config(&cfg) != ESP_OK {
                return Err(Error::Init("button gpio_config"));
            }
            let ret = gpio_isr_handler_add(gpio, Some(button_gpio_isr), key_id as *mut _);
            if ret != ESP_OK {
                return Err(Error::Init("button gpio_isr_handler_add"));
            }
            gpio_intr_enable(gpio);
        }
    }
    log::info!("buttons: {} GPIO ISRs installed", crate::pins::BUTTON_GPIOS.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_buttons() -> crate::error::Result<()> {
    log::info!("buttons(sim): ISR install skipped");
    Ok(())
}
