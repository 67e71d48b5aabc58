//! Button ISR wiring and core-pinned task spawning.

pub mod button;
pub mod task_pin;
