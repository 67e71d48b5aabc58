//! GPIO pin assignments for the BPSLink board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Heartbeat LED (single colour)
// ---------------------------------------------------------------------------

pub const LED_HEARTBEAT_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Link LED (discrete RGB, common cathode)
// ---------------------------------------------------------------------------

pub const LED_RED_GPIO: i32 = 11;
pub const LED_GREEN_GPIO: i32 = 12;
pub const LED_BLUE_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// User buttons (active-low with internal pull-up)
// ---------------------------------------------------------------------------

/// Advertising / bonding / reset button.
pub const BUTTON_ADV_GPIO: i32 = 16;
/// Auxiliary button (classified but currently unassigned).
pub const BUTTON_AUX_GPIO: i32 = 17;

/// Indexed by [`ButtonId`](crate::app::click::ButtonId).
pub const BUTTON_GPIOS: [i32; crate::app::click::BUTTON_COUNT] = [BUTTON_ADV_GPIO, BUTTON_AUX_GPIO];
