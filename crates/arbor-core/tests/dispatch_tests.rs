//! Integration tests for five-phase dispatch through component trees.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbor_core::prelude::*;

// -- notification types -----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Ping(u32);

#[derive(Debug, Clone, PartialEq)]
struct Pong;

// -- helpers ----------------------------------------------------------------

type Log = Rc<RefCell<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records every `Ping` callback it receives. Optionally carries children and
/// optionally fails in `on_notify`.
struct Probe {
    tag: &'static str,
    log: Log,
    hierarchy: Option<Hierarchy>,
    fail_on_notify: bool,
}

impl Probe {
    fn leaf(tag: &'static str, log: &Log) -> ComponentRef {
        ComponentRef::new(Self {
            tag,
            log: log.clone(),
            hierarchy: None,
            fail_on_notify: false,
        })
    }

    fn failing(tag: &'static str, log: &Log) -> ComponentRef {
        ComponentRef::new(Self {
            tag,
            log: log.clone(),
            hierarchy: None,
            fail_on_notify: true,
        })
    }

    fn node(tag: &'static str, log: &Log) -> ComponentRef {
        ComponentRef::new(Self {
            tag,
            log: log.clone(),
            hierarchy: Some(Hierarchy::new(tag)),
            fail_on_notify: false,
        })
    }

    fn record(&self, event: &str, ping: &Ping) {
        self.log
            .borrow_mut()
            .push(format!("{}:{}({})", self.tag, event, ping.0));
    }
}

impl Listener<Ping> for Probe {
    fn on_notify(&self, ping: &Ping) -> anyhow::Result<()> {
        self.record("notify", ping);
        if self.fail_on_notify {
            anyhow::bail!("{} refused ping {}", self.tag, ping.0);
        }
        Ok(())
    }
}

impl Hook<Ping> for Probe {
    fn on_pre_notify(&self, ping: &Ping) -> anyhow::Result<()> {
        self.record("pre", ping);
        Ok(())
    }

    fn on_post_notify(&self, ping: &Ping) -> anyhow::Result<()> {
        self.record("post", ping);
        Ok(())
    }

    fn on_post_propagate(&self, ping: &Ping) -> anyhow::Result<()> {
        self.record("post-propagate", ping);
        Ok(())
    }
}

impl Component for Probe {
    fn hierarchy(&self) -> Option<&Hierarchy> {
        self.hierarchy.as_ref()
    }

    fn roles(&self, roles: &mut Roles<'_>) {
        roles.hook::<Ping>(self).listener::<Ping>(self);
    }
}

fn child_hierarchy(node: &ComponentRef) -> &Hierarchy {
    node.hierarchy().expect("node carries a hierarchy")
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ---------------------------------------------------------------------------
// Phase ordering
// ---------------------------------------------------------------------------

#[test]
fn leaf_with_all_roles_sees_four_callbacks_in_order() {
    init_tracing();
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    root.add_child(Probe::leaf("a", &log));

    root.notify(&Ping(1)).unwrap();

    assert_eq!(
        entries(&log),
        ["a:pre(1)", "a:notify(1)", "a:post(1)", "a:post-propagate(1)"]
    );
}

#[test]
fn each_phase_completes_across_all_children_before_the_next() {
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    root.add_child(Probe::leaf("a", &log));
    root.add_child(Probe::leaf("b", &log));

    root.notify(&Ping(2)).unwrap();

    assert_eq!(
        entries(&log),
        [
            "a:pre(2)",
            "b:pre(2)",
            "a:notify(2)",
            "b:notify(2)",
            "a:post(2)",
            "b:post(2)",
            "a:post-propagate(2)",
            "b:post-propagate(2)",
        ]
    );
}

#[test]
fn notification_of_unhandled_type_reaches_nobody() {
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    root.add_child(Probe::leaf("a", &log));

    root.notify(&Pong).unwrap();

    assert!(entries(&log).is_empty());
}

// ---------------------------------------------------------------------------
// Recursive propagation
// ---------------------------------------------------------------------------

#[test]
fn nested_dispatch_runs_between_post_and_post_propagate() {
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let mid = Probe::node("mid", &log);
    child_hierarchy(&mid).add_child(Probe::leaf("leaf", &log));
    root.add_child(mid);

    root.notify(&Ping(3)).unwrap();

    assert_eq!(
        entries(&log),
        [
            "mid:pre(3)",
            "mid:notify(3)",
            "mid:post(3)",
            "leaf:pre(3)",
            "leaf:notify(3)",
            "leaf:post(3)",
            "leaf:post-propagate(3)",
            "mid:post-propagate(3)",
        ]
    );
}

#[test]
fn component_without_propagator_is_a_leaf_even_with_children() {
    struct Opaque {
        inner: Hierarchy,
    }

    impl Component for Opaque {
        fn hierarchy(&self) -> Option<&Hierarchy> {
            Some(&self.inner)
        }

        fn propagator(&self) -> Option<&dyn Propagator> {
            None
        }
    }

    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let opaque = ComponentRef::new(Opaque {
        inner: Hierarchy::new("opaque"),
    });
    child_hierarchy(&opaque).add_child(Probe::leaf("hidden", &log));
    root.add_child(opaque);

    root.notify(&Ping(4)).unwrap();

    assert!(entries(&log).is_empty());
}

#[test]
fn composite_forwards_to_its_parts() {
    struct ButtonText {
        text: ComponentRef,
        button: ComponentRef,
    }

    impl Propagator for ButtonText {
        fn propagate(&self, notification: &Notification<'_>) -> Result<(), DispatchError> {
            propagate_to(notification, &[self.text.clone(), self.button.clone()])
        }
    }

    impl Component for ButtonText {
        fn propagator(&self) -> Option<&dyn Propagator> {
            Some(self)
        }
    }

    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let widget = ComponentRef::new(ButtonText {
        text: Probe::leaf("text", &log),
        button: Probe::leaf("button", &log),
    });
    root.add_child(widget.clone());

    root.notify(&Ping(5)).unwrap();

    assert_eq!(
        entries(&log),
        [
            "text:pre(5)",
            "button:pre(5)",
            "text:notify(5)",
            "button:notify(5)",
            "text:post(5)",
            "button:post(5)",
            "text:post-propagate(5)",
            "button:post-propagate(5)",
        ]
    );
    assert_eq!(root.tree_string(), "root\n\u{2514} ButtonText\n");
}

// ---------------------------------------------------------------------------
// Reentrancy
// ---------------------------------------------------------------------------

/// On `Ping`, sends `Ping` and `Pong` back into `target`.
struct Echo {
    target: RefCell<Option<ComponentRef>>,
    nested_results: RefCell<Vec<bool>>,
    log: Log,
}

impl Listener<Ping> for Echo {
    fn on_notify(&self, ping: &Ping) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("echo:notify({})", ping.0));
        if let Some(target) = self.target.borrow().as_ref() {
            let same_type = target.notify(&Ping(ping.0 + 100)).is_ok();
            let other_type = target.notify(&Pong).is_ok();
            self.nested_results.borrow_mut().extend([same_type, other_type]);
        }
        Ok(())
    }
}

impl Hook<Ping> for Echo {
    fn on_post_notify(&self, ping: &Ping) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("echo:post({})", ping.0));
        Ok(())
    }

    fn on_post_propagate(&self, ping: &Ping) -> anyhow::Result<()> {
        self.log
            .borrow_mut()
            .push(format!("echo:post-propagate({})", ping.0));
        Ok(())
    }
}

impl Component for Echo {
    fn roles(&self, roles: &mut Roles<'_>) {
        roles.listener::<Ping>(self).hook::<Ping>(self);
    }
}

/// Counts `Pong`s.
#[derive(Default)]
struct PongCounter(Cell<u32>);

impl Listener<Pong> for PongCounter {
    fn on_notify(&self, _: &Pong) -> anyhow::Result<()> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

impl Component for PongCounter {
    fn roles(&self, roles: &mut Roles<'_>) {
        roles.listener::<Pong>(self);
    }
}

#[test]
fn reentrant_notify_is_suppressed_for_any_type() {
    init_tracing();
    let log: Log = Rc::default();
    let root = ComponentRef::new(Hierarchy::new("root"));
    let echo = Rc::new(Echo {
        target: RefCell::new(Some(root.clone())),
        nested_results: RefCell::new(Vec::new()),
        log: log.clone(),
    });
    let pongs = Rc::new(PongCounter::default());

    let hierarchy = child_hierarchy(&root);
    hierarchy.add_child(ComponentRef::from_rc(echo.clone()));
    hierarchy.add_child(ComponentRef::from_rc(pongs.clone()));

    root.notify(&Ping(1)).unwrap();

    assert_eq!(
        entries(&log),
        ["echo:notify(1)", "echo:post(1)", "echo:post-propagate(1)"]
    );
    assert_eq!(*echo.nested_results.borrow(), vec![true, true]);
    assert_eq!(pongs.0.get(), 0, "nested Pong must be dropped");
    assert!(!hierarchy.is_dispatching());

    // Outside of a dispatch, Pong goes through.
    root.notify(&Pong).unwrap();
    assert_eq!(pongs.0.get(), 1);

    echo.target.borrow_mut().take();
}

#[test]
fn notifying_a_different_hierarchy_from_a_callback_is_allowed() {
    let log: Log = Rc::default();
    let side = ComponentRef::new(Hierarchy::new("side"));
    child_hierarchy(&side).add_child(Probe::leaf("side-leaf", &log));

    let root = Hierarchy::new("root");
    root.add_child(ComponentRef::new(Echo {
        target: RefCell::new(Some(side)),
        nested_results: RefCell::new(Vec::new()),
        log: log.clone(),
    }));

    root.notify(&Ping(1)).unwrap();

    assert_eq!(
        entries(&log),
        [
            "echo:notify(1)",
            "side-leaf:pre(101)",
            "side-leaf:notify(101)",
            "side-leaf:post(101)",
            "side-leaf:post-propagate(101)",
            "echo:post(1)",
            "echo:post-propagate(1)",
        ]
    );
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

#[test]
fn failing_handler_stops_the_rest_of_the_dispatch() {
    init_tracing();
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let first = Probe::failing("first", &log);
    root.add_child(first.clone());
    root.add_child(Probe::leaf("second", &log));

    let err = root.notify(&Ping(7)).unwrap_err();

    assert_eq!(
        entries(&log),
        ["first:pre(7)", "second:pre(7)", "first:notify(7)"]
    );
    assert_eq!(err.component_id(), first.id());
    assert_eq!(err.phase(), Phase::Notify);
    let DispatchError::Callback { source, .. } = &err;
    assert_eq!(source.to_string(), "first refused ping 7");
    assert!(err.to_string().contains("failed during notify"));
}

#[test]
fn hierarchy_is_idle_again_after_a_fault() {
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let failing = Probe::failing("bad", &log);
    root.add_child(failing.clone());

    assert!(root.notify(&Ping(1)).is_err());
    assert_eq!(root.state(), DispatchState::Idle);

    root.remove_child(&failing);
    root.add_child(Probe::leaf("good", &log));
    log.borrow_mut().clear();

    root.notify(&Ping(2)).unwrap();
    assert_eq!(entries(&log).len(), 4);
}

#[test]
fn nested_fault_unwinds_through_every_frame() {
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let mid = Probe::node("mid", &log);
    let deep = Probe::failing("deep", &log);
    child_hierarchy(&mid).add_child(deep.clone());
    root.add_child(mid.clone());
    root.add_child(Probe::node("after", &log));

    let err = root.notify(&Ping(9)).unwrap_err();

    assert_eq!(err.component_id(), deep.id());
    assert_eq!(
        entries(&log),
        [
            "mid:pre(9)",
            "after:pre(9)",
            "mid:notify(9)",
            "after:notify(9)",
            "mid:post(9)",
            "after:post(9)",
            "deep:pre(9)",
            "deep:notify(9)",
        ]
    );
    assert!(!child_hierarchy(&mid).is_dispatching());
}

// ---------------------------------------------------------------------------
// Tree mutation and role evaluation
// ---------------------------------------------------------------------------

/// Appends a new probe to `parent` the first time it handles a `Ping`.
struct Spawner {
    parent: RefCell<Option<ComponentRef>>,
    log: Log,
}

impl Listener<Ping> for Spawner {
    fn on_notify(&self, _: &Ping) -> anyhow::Result<()> {
        if let Some(parent) = self.parent.borrow_mut().take() {
            child_hierarchy(&parent).add_child(Probe::leaf("spawned", &self.log));
        }
        Ok(())
    }
}

impl Component for Spawner {
    fn roles(&self, roles: &mut Roles<'_>) {
        roles.listener::<Ping>(self);
    }
}

#[test]
fn child_added_mid_dispatch_joins_from_the_next_phase() {
    let log: Log = Rc::default();
    let root = ComponentRef::new(Hierarchy::new("root"));
    child_hierarchy(&root).add_child(ComponentRef::new(Spawner {
        parent: RefCell::new(Some(root.clone())),
        log: log.clone(),
    }));

    root.notify(&Ping(1)).unwrap();

    assert_eq!(
        entries(&log),
        ["spawned:post(1)", "spawned:post-propagate(1)"]
    );
    assert_eq!(child_hierarchy(&root).len(), 2);
}

#[test]
fn roles_are_re_evaluated_on_every_call() {
    struct Toggle {
        enabled: Cell<bool>,
        hits: Cell<u32>,
    }

    impl Listener<Ping> for Toggle {
        fn on_notify(&self, _: &Ping) -> anyhow::Result<()> {
            self.hits.set(self.hits.get() + 1);
            Ok(())
        }
    }

    impl Component for Toggle {
        fn roles(&self, roles: &mut Roles<'_>) {
            if self.enabled.get() {
                roles.listener::<Ping>(self);
            }
        }
    }

    let toggle = Rc::new(Toggle {
        enabled: Cell::new(false),
        hits: Cell::new(0),
    });
    let root = Hierarchy::new("root");
    root.add_child(ComponentRef::from_rc(toggle.clone()));

    root.notify(&Ping(1)).unwrap();
    toggle.enabled.set(true);
    root.notify(&Ping(2)).unwrap();

    assert_eq!(toggle.hits.get(), 1);
}

#[test]
fn duplicate_children_are_delivered_once_per_occurrence() {
    let log: Log = Rc::default();
    let root = Hierarchy::new("root");
    let probe = Probe::leaf("dup", &log);
    root.add_child(probe.clone());
    root.add_child(probe);

    root.notify(&Ping(1)).unwrap();

    assert_eq!(entries(&log).len(), 8);
}
