use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use linked_charts::api::{Chart, ChartDrawer, ChartGroup, ChartRegistry, EventDetail};
use linked_charts::core::Filter;
use linked_charts::error::{ChartError, ChartResult};
use linked_charts::extensions::CommitCallback;
use linked_charts::render::Element;
use serde_json::json;

type Log = Rc<RefCell<Vec<String>>>;

fn chart_in(registry: &ChartRegistry, group: Option<&str>, name: &str, log: &Log) -> Chart {
    let root = registry
        .document()
        .append(Element::new("div").with_id(name).with_bounds(300.0, 200.0));
    let chart = registry.chart(&root, group).expect("chart");
    chart.configure(json!({"transitionDuration": 0})).expect("configure");
    for (event, verb) in [("preRender", "render"), ("preRedraw", "redraw")] {
        let sink = log.clone();
        let name = name.to_owned();
        chart
            .on(&format!("{event}.log"), move |_: &Chart, _: &EventDetail| {
                sink.borrow_mut().push(format!("{verb} {name}"))
            })
            .expect("listener");
    }
    chart
}

struct FailingDrawer;

impl ChartDrawer for FailingDrawer {
    fn update(&mut self, _chart: &Chart) -> ChartResult<()> {
        Err(ChartError::InvalidState("no dimension configured".to_owned()))
    }
}

#[test]
fn redraw_all_follows_registration_order() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let _a = chart_in(&registry, None, "a", &log);
    let _b = chart_in(&registry, None, "b", &log);
    let _c = chart_in(&registry, None, "c", &log);

    registry.redraw_all(None).expect("redraw all");

    assert_eq!(*log.borrow(), vec!["redraw a", "redraw b", "redraw c"]);
}

#[test]
fn groups_are_independent() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let _a = chart_in(&registry, Some("left"), "a", &log);
    let _b = chart_in(&registry, Some("right"), "b", &log);

    registry.render_all(Some("left")).expect("render left");

    assert_eq!(*log.borrow(), vec!["render a"]);
}

#[test]
fn failing_member_does_not_stop_the_pass() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let _a = chart_in(&registry, None, "a", &log);
    let b = chart_in(&registry, None, "b", &log);
    let _c = chart_in(&registry, None, "c", &log);
    b.set_drawer(FailingDrawer).expect("drawer");

    let err = registry.redraw_all(None).expect_err("b fails");

    assert_eq!(*log.borrow(), vec!["redraw a", "redraw b", "redraw c"]);
    match err {
        ChartError::GroupFailures { group, failures } => {
            assert_eq!(group, registry.default_group().name());
            assert_eq!(failures.len(), 1);
            assert_eq!(&failures[0].chart_id, b.id());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejected_commit_skips_group_action_without_error() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let a = chart_in(&registry, None, "a", &log);
    let _b = chart_in(&registry, None, "b", &log);
    a.set_commit_handler(|_render: bool, done: CommitCallback| {
        done(Err(ChartError::Commit("backend unavailable".to_owned())))
    })
    .expect("handler");

    a.redraw_group().expect("errors are logged, not returned");
    a.render_group().expect("errors are logged, not returned");

    assert!(log.borrow().is_empty());
}

#[test]
fn deferred_commit_runs_group_action_on_success() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let a = chart_in(&registry, None, "a", &log);
    let _b = chart_in(&registry, None, "b", &log);
    let scheduler = registry.scheduler().clone();
    let modes = Rc::new(RefCell::new(Vec::new()));
    let seen_modes = modes.clone();
    a.set_commit_handler(move |render: bool, done: CommitCallback| {
        seen_modes.borrow_mut().push(render);
        scheduler.schedule(Duration::from_millis(5), move || done(Ok(())));
    })
    .expect("handler");

    a.redraw_group().expect("redraw group");
    assert!(log.borrow().is_empty());

    registry.scheduler().advance(Duration::from_millis(5));
    assert_eq!(*log.borrow(), vec!["redraw a", "redraw b"]);

    a.render_group().expect("render group");
    registry.scheduler().run_until_idle();
    assert_eq!(log.borrow().len(), 4);
    assert_eq!(*modes.borrow(), vec![false, true]);
}

#[test]
fn without_commit_handler_group_action_is_synchronous() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let a = chart_in(&registry, None, "a", &log);
    let _b = chart_in(&registry, None, "b", &log);
    assert!(!a.has_commit_handler());

    a.render_group().expect("render group");

    assert_eq!(*log.borrow(), vec!["render a", "render b"]);
}

#[test]
fn failing_member_surfaces_through_synchronous_group_request() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let a = chart_in(&registry, None, "a", &log);
    let b = chart_in(&registry, None, "b", &log);
    b.set_drawer(FailingDrawer).expect("drawer");

    let err = a.redraw_group().expect_err("b fails");
    assert!(matches!(err, ChartError::GroupFailures { .. }));
}

#[test]
fn group_renderlet_runs_after_each_pass() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let _a = chart_in(&registry, None, "a", &log);
    let sink = log.clone();
    registry
        .default_group()
        .set_renderlet(move |group: &ChartGroup| sink.borrow_mut().push(format!("group {}", group.len())));

    registry.render_all(None).expect("render");
    registry.redraw_all(None).expect("redraw");

    assert_eq!(
        *log.borrow(),
        vec!["render a", "group 1", "redraw a", "group 1"]
    );
}

#[test]
fn filter_all_clears_every_member() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let a = chart_in(&registry, None, "a", &log);
    let b = chart_in(&registry, None, "b", &log);
    a.set_filter(Some(Filter::key("x"))).expect("filter a");
    b.set_filter(Some(Filter::range(1.0, 2.0))).expect("filter b");

    registry.filter_all(None).expect("filter all");

    assert!(!a.has_filter(None).expect("has_filter"));
    assert!(!b.has_filter(None).expect("has_filter"));
    assert!(registry.default_group().filter_store().active_keys().is_empty());
}

#[test]
fn register_is_idempotent_and_ignores_children() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let a = chart_in(&registry, None, "a", &log);
    let child = registry.chart(&a, None).expect("child");
    let group = registry.default_group();

    group.register(&a);
    group.register(&child);
    assert_eq!(group.charts(), vec![a.clone()]);

    group.deregister(&child);
    group.deregister(&a);
    group.deregister(&a);
    assert!(group.is_empty());
    assert!(!registry.has_chart(&a));
}

#[test]
fn deregister_all_empties_group() {
    let registry = ChartRegistry::new();
    let log = Log::default();
    let _a = chart_in(&registry, None, "a", &log);
    let _b = chart_in(&registry, None, "b", &log);

    registry.default_group().deregister_all();
    registry.redraw_all(None).expect("nothing to redraw");

    assert!(log.borrow().is_empty());
}

#[test]
fn standalone_group_has_its_own_context() {
    let group = ChartGroup::new("solo");
    let root = Element::new("div").with_bounds(120.0, 90.0);
    let chart = Chart::new(&root, &group).expect("chart");
    let other = ChartGroup::new("solo");

    assert_eq!(group.charts(), vec![chart]);
    assert_ne!(group, other);
    assert!(group.scheduler().is_idle());
}
