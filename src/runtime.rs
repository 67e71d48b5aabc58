//! Coordination runtime: the three periodic tasks on one pinned thread.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` for reactor-driven timers (no
//! busy-spinning). Three concurrent futures:
//!
//! 1. **Reconcile**: [`Reconciler::tick`] every `reconcile_period_ms`
//! 2. **Indicator**: [`IndicatorScheduler::tick`] every
//!    `indicator_period_ms`; awaits the reset dwell in place
//! 3. **Input**: drains the dispatch queue and polls click timers every
//!    `reconcile_period_ms`
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  Coordination thread (Core 1)                            │
//!  │  ┌────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                      │  │
//!  │  │  ┌───────────┐  ┌─────────────┐  ┌──────────────┐  │  │
//!  │  │  │ Reconcile │  │ Indicator   │  │ Input        │  │  │
//!  │  │  │ 10ms ⏱    │  │ 100ms ⏱     │  │ 10ms ⏱       │  │  │
//!  │  │  └─────┬─────┘  └──────┬──────┘  └──────┬───────┘  │  │
//!  │  └────────┼───────────────┼────────────────┼──────────┘  │
//!  └───────────┼───────────────┼────────────────┼─────────────┘
//!              ▼               ▼                ▼
//!           RadioPort     IndicatorPort     DeviceStatus
//! ```
//!
//! The tasks share nothing but the `&'static DeviceStatus`; a stalled
//! task (the indicator during a reset flash) never delays the others.

use core::time::Duration;
use std::io;
use std::rc::Rc;
use std::thread::JoinHandle;

use async_io_mini::Timer;
use log::{info, warn};

use crate::app::click::ClickTiming;
use crate::app::indicator::{IndicatorScheduler, IndicatorTiming};
use crate::app::input::InputHandler;
use crate::app::ports::{Clock, IndicatorPort, RadioPort};
use crate::app::reconcile::Reconciler;
use crate::config::DeviceConfig;
use crate::drivers::button::dropped_edges;
use crate::drivers::task_pin::{Core, spawn_on_core};
use crate::events::drain_events;
use crate::status::DeviceStatus;

const COORD_PRIORITY: u8 = 5;
const COORD_STACK_KB: usize = 8;

fn millis(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms))
}

// ── Tasks ─────────────────────────────────────────────────────

async fn reconcile_loop<R: RadioPort>(status: &'static DeviceStatus, period_ms: u32, mut radio: R) {
    let mut reconciler = Reconciler::new(status);
    loop {
        reconciler.tick(&mut radio);
        Timer::after(millis(period_ms)).await;
    }
}

async fn indicator_loop<L: IndicatorPort, C: Clock>(
    status: &'static DeviceStatus,
    timing: IndicatorTiming,
    period_ms: u32,
    mut leds: L,
    clock: Rc<C>,
) {
    let mut scheduler = IndicatorScheduler::new(status, timing, clock.now_ms());
    loop {
        if let Some(flash) = scheduler.tick(clock.now_ms(), &mut leds) {
            Timer::after(millis(flash.dwell_ms)).await;
            scheduler.finish_reset_flash(clock.now_ms(), &mut leds);
        }
        Timer::after(millis(period_ms)).await;
    }
}

async fn input_loop<C: Clock>(
    status: &'static DeviceStatus,
    timing: ClickTiming,
    period_ms: u32,
    clock: Rc<C>,
) {
    let mut input = InputHandler::new(status, timing);
    let mut dropped_seen = dropped_edges();
    loop {
        drain_events(|event| input.handle(event));

        let dropped = dropped_edges();
        if dropped != dropped_seen {
            warn!("input: {} button edge(s) dropped, queue full", dropped.wrapping_sub(dropped_seen));
            dropped_seen = dropped;
            input.edges_lost();
        }

        input.poll(clock.now_ms());
        Timer::after(millis(period_ms)).await;
    }
}

// ── Entry point ───────────────────────────────────────────────

/// Run the three tasks on the calling thread. Never returns.
pub fn run<R, L, C>(status: &'static DeviceStatus, config: &DeviceConfig, radio: R, leds: L, clock: C)
where
    R: RadioPort,
    L: IndicatorPort,
    C: Clock,
{
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let clock = Rc::new(clock);

    executor
        .spawn(reconcile_loop(status, config.reconcile_period_ms, radio))
        .detach();
    executor
        .spawn(indicator_loop(
            status,
            IndicatorTiming::from(config),
            config.indicator_period_ms,
            leds,
            clock.clone(),
        ))
        .detach();
    executor
        .spawn(input_loop(
            status,
            ClickTiming::from(config),
            config.reconcile_period_ms,
            clock,
        ))
        .detach();

    info!(
        "Coordination tasks started (reconcile {}ms, indicator {}ms)",
        config.reconcile_period_ms, config.indicator_period_ms
    );

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

/// Spawn the coordination thread pinned to Core 1 (APP_CPU).
///
/// Takes ownership of the adapters; Bluedroid keeps Core 0 to itself.
pub fn spawn<R, L, C>(
    status: &'static DeviceStatus,
    config: DeviceConfig,
    radio: R,
    leds: L,
    clock: C,
) -> io::Result<JoinHandle<()>>
where
    R: RadioPort + Send + 'static,
    L: IndicatorPort + Send + 'static,
    C: Clock + Send + 'static,
{
    spawn_on_core(
        Core::App,
        COORD_PRIORITY,
        COORD_STACK_KB,
        "coord\0",
        move || run(status, &config, radio, leds, clock),
    )
}
