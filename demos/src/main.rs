//! Pelican crossing demo
//!
//! A pedestrian crossing controller as a hierarchical state machine:
//!
//! ```text
//! Root
//! ├── Operational (initial → VehiclesGo)
//! │   ├── VehiclesGo
//! │   ├── VehiclesCaution
//! │   └── PedestriansWalk
//! └── Offline
//! ```
//!
//! The controller runs as an active object; the main thread plays the
//! role of the push button and a maintenance switch posting events into
//! its queue. Run with `RUST_LOG=trace` to watch every entry, exit, and
//! transition.

use std::thread;
use std::time::Duration;

use qf4rs_core::{QEvent, QPriority, QSignal, QStaticEvent};
use qf4rs_qep::{HierarchyBuilder, QStateReturn};
use qf4rs_qf::{ActiveObject, PriorityRegistry, QActive};
use tracing::info;

/// Signals for the crossing application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
enum CrossingSignal {
    /// Pedestrian pressed the button
    Button = 1,
    /// Phase timer elapsed
    Timeout = 2,
    /// Maintenance switch toggled
    Offline = 3,
    /// Back to normal operation
    Online = 4,
}

impl From<CrossingSignal> for QSignal {
    fn from(sig: CrossingSignal) -> Self {
        QSignal::new(sig as u16)
    }
}

fn post(controller: &dyn QActive, sig: CrossingSignal) {
    controller
        .post_fifo(Box::new(QStaticEvent::new(sig.into())))
        .expect("controller queue overflow");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut builder = HierarchyBuilder::new();
    let root = builder.state("Root");
    let operational = builder.child("Operational", root);
    let vehicles_go = builder.child("VehiclesGo", operational);
    let vehicles_caution = builder.child("VehiclesCaution", operational);
    let pedestrians_walk = builder.child("PedestriansWalk", operational);
    let offline = builder.child("Offline", root);
    builder.initial(root, operational);
    builder.initial(operational, vehicles_go);

    builder.on_entry(vehicles_go, || info!("vehicles: GREEN, pedestrians: wait"));
    builder.on_entry(vehicles_caution, || info!("vehicles: YELLOW"));
    builder.on_entry(pedestrians_walk, || info!("vehicles: RED, pedestrians: WALK"));
    builder.on_entry(offline, || info!("crossing dark, flashing yellow"));
    builder.on_exit(offline, || info!("leaving maintenance mode"));

    builder.on_event(vehicles_go, move |evt| {
        if evt.signal() == CrossingSignal::Button.into() {
            QStateReturn::Transition(vehicles_caution)
        } else {
            QStateReturn::Ignored
        }
    });
    builder.on_event(vehicles_caution, move |evt| {
        if evt.signal() == CrossingSignal::Timeout.into() {
            QStateReturn::Transition(pedestrians_walk)
        } else {
            QStateReturn::Ignored
        }
    });
    builder.on_event(pedestrians_walk, move |evt| {
        if evt.signal() == CrossingSignal::Timeout.into() {
            QStateReturn::Transition(vehicles_go)
        } else {
            QStateReturn::Ignored
        }
    });
    // The whole operational region reacts to the maintenance switch;
    // leaves inherit the behavior from their composite parent.
    builder.on_event(operational, move |evt| {
        if evt.signal() == CrossingSignal::Offline.into() {
            QStateReturn::Transition(offline)
        } else {
            QStateReturn::Ignored
        }
    });
    builder.on_event(offline, move |evt| {
        if evt.signal() == CrossingSignal::Online.into() {
            // Re-entering Operational resolves its initial transition
            // back down to VehiclesGo.
            QStateReturn::Transition(operational)
        } else {
            QStateReturn::Ignored
        }
    });

    let hierarchy = std::sync::Arc::new(builder.build().expect("valid hierarchy"));
    let registry = std::sync::Arc::new(PriorityRegistry::new());

    let controller: ActiveObject = ActiveObject::new(hierarchy, registry);
    controller
        .start(QPriority::new(1).expect("valid priority"))
        .expect("controller starts");

    let beat = Duration::from_millis(400);
    thread::sleep(beat);
    info!(state = %controller.current_state_name(), "crossing up");

    post(&controller, CrossingSignal::Button);
    thread::sleep(beat);
    post(&controller, CrossingSignal::Timeout);
    thread::sleep(beat);
    post(&controller, CrossingSignal::Timeout);
    thread::sleep(beat);

    post(&controller, CrossingSignal::Offline);
    thread::sleep(beat);
    post(&controller, CrossingSignal::Online);
    thread::sleep(beat);
    info!(state = %controller.current_state_name(), "back in service");

    controller.stop().expect("controller stops");
}
