//! Active object integration tests
//!
//! End-to-end coverage of the active-object contract: the start cascade,
//! transitions driven through the queue, FIFO/LIFO ordering, priority
//! uniqueness, and stop semantics.

use qf4rs_core::{QDynamicEvent, QEvent, QPriority, QSignal, QStaticEvent};
use qf4rs_qep::{HierarchyBuilder, QStateReturn, StateHierarchy, StateId};
use qf4rs_qf::{ActiveObject, PriorityRegistry, QActive};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TO_B: QSignal = QSignal::new(100);
const TO_A: QSignal = QSignal::new(101);
const SLOW: QSignal = QSignal::new(102);
const MARK: QSignal = QSignal::new(103);
const LABEL: QSignal = QSignal::new(104);
const PING: QSignal = QSignal::new(105);

type Log = Arc<Mutex<Vec<String>>>;

struct Fixture {
    hierarchy: Arc<StateHierarchy>,
    root: StateId,
    a: StateId,
    a1: StateId,
    b: StateId,
    log: Log,
}

/// Root → Composite A (initial → A1) → {A1, A2}; leaf B.
fn fixture() -> Fixture {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = HierarchyBuilder::new();

    let root = builder.state("Root");
    let a = builder.child("A", root);
    let a1 = builder.child("A1", a);
    let _a2 = builder.child("A2", a);
    let b = builder.child("B", root);
    builder.initial(root, a);
    builder.initial(a, a1);

    for (id, name) in [(root, "Root"), (a, "A"), (a1, "A1"), (b, "B")] {
        let entry_log = Arc::clone(&log);
        let exit_log = Arc::clone(&log);
        builder.on_entry(id, move || entry_log.lock().unwrap().push(format!("enter:{name}")));
        builder.on_exit(id, move || exit_log.lock().unwrap().push(format!("exit:{name}")));
    }

    let a1_log = Arc::clone(&log);
    builder.on_event(a1, move |evt| match evt.signal() {
        TO_B => QStateReturn::Transition(b),
        SLOW => {
            // Simulates a long run-to-completion step.
            std::thread::sleep(Duration::from_millis(150));
            a1_log.lock().unwrap().push("slow".into());
            QStateReturn::Handled
        }
        MARK => {
            a1_log.lock().unwrap().push("mark".into());
            QStateReturn::Handled
        }
        LABEL => {
            let label = evt
                .as_any()
                .downcast_ref::<QDynamicEvent<String>>()
                .map(|e| e.data.clone())
                .unwrap_or_default();
            a1_log.lock().unwrap().push(label);
            QStateReturn::Handled
        }
        _ => QStateReturn::Ignored,
    });
    builder.on_event(b, move |evt| match evt.signal() {
        TO_A => QStateReturn::Transition(a),
        _ => QStateReturn::Ignored,
    });

    Fixture {
        hierarchy: Arc::new(builder.build().unwrap()),
        root,
        a,
        a1,
        b,
        log,
    }
}

fn evt(signal: QSignal) -> Box<dyn QEvent> {
    Box::new(QStaticEvent::new(signal))
}

fn label(text: &str) -> Box<dyn QEvent> {
    Box::new(QDynamicEvent::new(LABEL, text.to_owned()))
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_start_cascades_into_initial_leaf() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let ao: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), registry);

    ao.start(QPriority::new(1).unwrap()).unwrap();
    wait_until(|| ao.current_state_name() == "A1");

    assert_eq!(entries(&fx.log), vec!["enter:Root", "enter:A", "enter:A1"]);
    assert!(ao.is_in_state(fx.root));
    assert!(ao.is_in_state(fx.a));
    assert!(ao.is_in_state(fx.a1));
    assert!(!ao.is_in_state(fx.b));
}

#[test]
fn test_posted_event_drives_transition() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let ao: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), registry);

    ao.start(QPriority::new(1).unwrap()).unwrap();
    wait_until(|| ao.current_state_name() == "A1");
    fx.log.lock().unwrap().clear();

    ao.post_fifo(evt(TO_B)).unwrap();
    wait_until(|| ao.current_state_name() == "B");

    // LCA(A1, B) is Root: exit A1, exit A, enter B.
    assert_eq!(entries(&fx.log), vec!["exit:A1", "exit:A", "enter:B"]);
    assert!(ao.is_in_state(fx.root));
    assert!(!ao.is_in_state(fx.a));
    assert!(ao.is_in_state(fx.b));
}

#[test]
fn test_fifo_order_preserved_while_busy() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let ao: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), registry);

    ao.start(QPriority::new(1).unwrap()).unwrap();
    wait_until(|| ao.current_state_name() == "A1");

    // The slow event occupies the thread while e1 and e2 queue behind it.
    ao.post_fifo(evt(SLOW)).unwrap();
    ao.post_fifo(label("e1")).unwrap();
    ao.post_fifo(label("e2")).unwrap();

    wait_until(|| entries(&fx.log).contains(&"e2".to_owned()));
    let log = entries(&fx.log);
    let slow = log.iter().position(|l| l == "slow").unwrap();
    let e1 = log.iter().position(|l| l == "e1").unwrap();
    let e2 = log.iter().position(|l| l == "e2").unwrap();
    assert!(slow < e1 && e1 < e2);
}

#[test]
fn test_lifo_event_jumps_the_queue() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let ao: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), registry);

    // Posting before start is accepted; the backlog establishes the
    // queue [e1, e2], then the LIFO post makes it [e3, e1, e2].
    ao.post_fifo(label("e1")).unwrap();
    ao.post_fifo(label("e2")).unwrap();
    ao.post_lifo(label("e3")).unwrap();
    assert_eq!(ao.queue_len(), 3);

    ao.start(QPriority::new(1).unwrap()).unwrap();
    wait_until(|| entries(&fx.log).contains(&"e2".to_owned()));

    let log = entries(&fx.log);
    let order: Vec<&String> = log
        .iter()
        .filter(|l| ["e1", "e2", "e3"].contains(&l.as_str()))
        .collect();
    assert_eq!(order, ["e3", "e1", "e2"]);
}

#[test]
fn test_same_priority_admits_exactly_one() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let x: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), Arc::clone(&registry));
    let y: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), Arc::clone(&registry));
    let p5 = QPriority::new(5).unwrap();

    x.start(p5).unwrap();
    assert_eq!(y.start(p5), Err(qf4rs_core::QError::PriorityConflict));

    assert_eq!(x.priority(), p5);
    assert_eq!(y.priority(), QPriority::UNSET);
    assert_eq!(y.lifecycle(), qf4rs_qf::QLifecycleState::NotStarted);

    // The loser may start under a free priority.
    y.start(QPriority::new(6).unwrap()).unwrap();
}

#[test]
fn test_unhandled_event_is_not_an_error() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let ao: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), registry);

    ao.start(QPriority::new(1).unwrap()).unwrap();
    wait_until(|| ao.current_state_name() == "A1");
    fx.log.lock().unwrap().clear();

    ao.post_fifo(evt(PING)).unwrap();
    // A later marker event proves PING was consumed without effect.
    ao.post_fifo(evt(MARK)).unwrap();
    wait_until(|| entries(&fx.log).contains(&"mark".to_owned()));

    assert_eq!(entries(&fx.log), vec!["mark"]);
    assert_eq!(ao.current_state_name(), "A1");
}

#[test]
fn test_stop_discards_backlog_after_inflight_dispatch() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let ao: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), registry);

    ao.start(QPriority::new(1).unwrap()).unwrap();
    wait_until(|| ao.current_state_name() == "A1");

    ao.post_fifo(evt(SLOW)).unwrap();
    ao.post_fifo(label("after-stop-1")).unwrap();
    ao.post_fifo(label("after-stop-2")).unwrap();

    // Let the slow dispatch begin, then stop mid-backlog.
    std::thread::sleep(Duration::from_millis(50));
    ao.stop().unwrap();

    let log = entries(&fx.log);
    assert!(log.contains(&"slow".to_owned()), "in-flight dispatch must finish");
    assert!(!log.contains(&"after-stop-1".to_owned()));
    assert!(!log.contains(&"after-stop-2".to_owned()));
}

#[test]
fn test_two_objects_share_one_hierarchy() {
    let fx = fixture();
    let registry = Arc::new(PriorityRegistry::new());
    let first: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), Arc::clone(&registry));
    let second: ActiveObject = ActiveObject::new(Arc::clone(&fx.hierarchy), Arc::clone(&registry));

    first.start(QPriority::new(1).unwrap()).unwrap();
    second.start(QPriority::new(2).unwrap()).unwrap();
    wait_until(|| first.current_state_name() == "A1" && second.current_state_name() == "A1");

    // Each machine owns its leaf independently.
    first.post_fifo(evt(TO_B)).unwrap();
    wait_until(|| first.current_state_name() == "B");
    assert_eq!(second.current_state_name(), "A1");
}
