use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;
use linked_charts::api::{
    AnchorTarget, Chart, ChartDrawer, ChartEvent, ChartRegistry, EventDetail, LifecyclePhase,
    NullDrawer, RegistryConfig, SizeSpec, WeakChart,
};
use linked_charts::core::{Bounds, Filter};
use linked_charts::error::{ChartError, ChartResult};
use linked_charts::extensions::{CommitCallback, Legend};
use linked_charts::render::{Element, ROOT_MARKER_CLASS, SURFACE_CLASS};
use serde_json::json;

type Log = Rc<RefCell<Vec<String>>>;

fn record_events(chart: &Chart, log: &Log) {
    for event in ChartEvent::ALL {
        let sink = log.clone();
        chart
            .on(&format!("{}.test", event.as_str()), move |_: &Chart, _: &EventDetail| {
                sink.borrow_mut().push(event.as_str().to_owned())
            })
            .expect("listener registers");
    }
}

fn anchored_chart(registry: &ChartRegistry, width: f64, height: f64) -> (Chart, Element) {
    let root = registry
        .document()
        .append(Element::new("div").with_bounds(width, height));
    let chart = registry.chart(&root, None).expect("chart builds");
    (chart, root)
}

struct RecordingDrawer {
    log: Log,
}

impl ChartDrawer for RecordingDrawer {
    fn draw(&mut self, chart: &Chart) -> ChartResult<()> {
        let width = chart.width()?;
        self.log.borrow_mut().push(format!("draw {width}"));
        Ok(())
    }

    fn update(&mut self, _chart: &Chart) -> ChartResult<()> {
        self.log.borrow_mut().push("update".to_owned());
        Ok(())
    }
}

struct RecordingLegend {
    log: Log,
    parent: Option<String>,
}

impl Legend for RecordingLegend {
    fn set_parent(&mut self, chart: &Chart) {
        self.parent = Some(chart.id().to_string());
    }

    fn render(&mut self) -> ChartResult<()> {
        let parent = self.parent.clone().unwrap_or_default();
        self.log.borrow_mut().push(format!("legend {parent}"));
        Ok(())
    }
}

#[test]
fn render_without_transition_notifies_synchronously_in_order() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 400.0, 300.0);
    chart.configure(json!({"transitionDuration": 0})).expect("configure");
    let log = Log::default();
    record_events(&chart, &log);
    chart
        .set_drawer(RecordingDrawer { log: log.clone() })
        .expect("drawer");
    chart
        .set_legend(RecordingLegend {
            log: log.clone(),
            parent: None,
        })
        .expect("legend");

    chart.render().expect("render");

    let expected = vec![
        "preRender".to_owned(),
        "draw 400".to_owned(),
        format!("legend {}", chart.id()),
        "pretransition".to_owned(),
        "renderlet".to_owned(),
        "postRender".to_owned(),
    ];
    assert_eq!(*log.borrow(), expected);
    assert_eq!(chart.phase(), LifecyclePhase::Rendered);
}

#[test]
fn redraw_runs_update_and_post_redraw_sequence() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 400.0, 300.0);
    chart.configure(json!({"transitionDuration": 0})).expect("configure");
    chart.render().expect("render");
    let log = Log::default();
    record_events(&chart, &log);
    chart
        .set_drawer(RecordingDrawer { log: log.clone() })
        .expect("drawer");

    chart.redraw().expect("redraw");

    assert_eq!(
        *log.borrow(),
        vec!["preRedraw", "update", "pretransition", "renderlet", "postRedraw"]
    );
    assert_eq!(chart.phase(), LifecyclePhase::Redrawn);
}

#[test]
fn transition_defers_post_hooks_until_completion() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 400.0, 300.0);
    chart
        .configure(json!({"transitionDuration": 100, "transitionDelay": 20}))
        .expect("configure");
    let log = Log::default();
    record_events(&chart, &log);

    chart.render().expect("render");
    assert_eq!(*log.borrow(), vec!["preRender", "pretransition"]);
    assert!(chart.surface().expect("surface").transition_pending());

    registry.scheduler().advance(Duration::from_millis(119));
    assert_eq!(log.borrow().len(), 2);

    registry.scheduler().advance(Duration::from_millis(1));
    assert_eq!(
        *log.borrow(),
        vec!["preRender", "pretransition", "renderlet", "postRender"]
    );
}

#[test]
fn superseded_transition_never_fires_stale_hooks() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 400.0, 300.0);
    chart.configure(json!({"transitionDuration": 100})).expect("configure");
    let log = Log::default();
    record_events(&chart, &log);

    chart.render().expect("render");
    registry.scheduler().advance(Duration::from_millis(50));
    chart.redraw().expect("redraw");
    registry.scheduler().run_until_idle();

    let log = log.borrow();
    assert_eq!(log.iter().filter(|event| *event == "renderlet").count(), 1);
    assert!(!log.contains(&"postRender".to_owned()));
    assert_eq!(log.last().map(String::as_str), Some("postRedraw"));
}

#[test]
fn disabled_transitions_make_notifications_synchronous() {
    let registry = ChartRegistry::with_config(RegistryConfig {
        disable_transitions: true,
        ..RegistryConfig::default()
    });
    let (chart, _) = anchored_chart(&registry, 400.0, 300.0);
    let log = Log::default();
    record_events(&chart, &log);

    chart.render().expect("render");

    assert_eq!(chart.transition_duration(), Duration::ZERO);
    assert_eq!(log.borrow().last().map(String::as_str), Some("postRender"));
    assert!(registry.scheduler().is_idle());
}

#[test]
fn explicit_and_default_widths() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 80.0, 80.0);

    chart.set_width(250.0).expect("set width");
    assert_eq!(chart.width().expect("width"), 250.0);

    chart.set_width(None::<f64>).expect("reset width");
    assert_eq!(chart.width().expect("width"), 200.0);
    assert!(matches!(chart.width_spec(), SizeSpec::Measured));
}

#[test]
fn zero_size_falls_back_to_default_calculation() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 80.0, 80.0);
    chart.set_width(250.0).expect("set width");
    chart.set_height(120.0).expect("set height");

    chart.set_width(0.0).expect("zero width");
    assert_eq!(chart.width().expect("width"), 200.0);
    assert!(matches!(chart.width_spec(), SizeSpec::Measured));

    chart.options(json!({"height": 0})).expect("zero height option");
    assert_eq!(chart.height().expect("height"), 200.0);
    assert!(matches!(chart.height_spec(), SizeSpec::Measured));
}

#[test]
fn computed_width_uses_root_element() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 640.0, 480.0);
    chart
        .set_width(SizeSpec::computed(|element| element.bounds().width / 3.0))
        .expect("set width");
    assert_relative_eq!(chart.width().expect("width"), 213.333_333, epsilon = 1e-5);
}

#[test]
fn negative_width_is_rejected() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 640.0, 480.0);
    let err = chart.set_width(-1.0).expect_err("negative width");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
}

#[test]
fn render_recomputes_cached_size() {
    let registry = ChartRegistry::new();
    let (chart, root) = anchored_chart(&registry, 500.0, 300.0);
    chart.configure(json!({"transitionDuration": 0})).expect("configure");

    chart.render().expect("first render");
    let first = (chart.width().expect("w"), chart.height().expect("h"));
    chart.render().expect("second render");
    let second = (chart.width().expect("w"), chart.height().expect("h"));
    assert_eq!(first, second);

    root.set_bounds(Bounds::new(700.0, 350.0));
    assert_eq!(chart.width().expect("cached"), 500.0);
    chart.render().expect("third render");
    assert_eq!(chart.width().expect("recomputed"), 700.0);

    let surface = chart.surface().expect("surface");
    assert_eq!(surface.element().attr("width").as_deref(), Some("700"));
    assert_eq!(surface.element().attr("height").as_deref(), Some("350"));
}

#[test]
fn view_box_resizing_sizes_surface_with_view_box() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 250.0);
    chart
        .configure(json!({"transitionDuration": 0, "useViewBoxResizing": true}))
        .expect("configure");

    chart.render().expect("render");

    let surface = chart.surface().expect("surface");
    assert_eq!(surface.element().attr("viewBox").as_deref(), Some("0 0 300 250"));
    assert_eq!(surface.element().attr("width"), None);
}

#[test]
fn root_anchor_is_marked_and_surface_created_once() {
    let registry = ChartRegistry::new();
    let (chart, root) = anchored_chart(&registry, 300.0, 200.0);
    chart.configure(json!({"transitionDuration": 0})).expect("configure");

    assert!(root.has_class(ROOT_MARKER_CLASS));
    assert!(chart.surface().is_none());

    chart.render().expect("render");
    chart.render().expect("render again");
    assert_eq!(root.select_all(&format!(".{SURFACE_CLASS}")).len(), 1);

    let fresh = chart.reset_surface().expect("reset surface");
    assert_eq!(root.select_all(&format!(".{SURFACE_CLASS}")).len(), 1);
    assert_eq!(chart.surface(), Some(fresh));
}

#[test]
fn selector_anchors_resolve_against_document() {
    let registry = ChartRegistry::new();
    registry
        .document()
        .append(Element::new("div").with_id("sales").with_bounds(320.0, 240.0));

    let chart = registry.chart("#sales", Some("dashboard")).expect("chart");
    assert!(chart.is_root());
    assert_eq!(chart.width().expect("width"), 320.0);
    assert!(registry.group(Some("dashboard")).has_chart(&chart));
}

#[test]
fn missing_anchor_targets_are_invalid_arguments() {
    let registry = ChartRegistry::new();
    for target in [
        AnchorTarget::from(""),
        AnchorTarget::from("#nowhere"),
        AnchorTarget::Selection(Vec::new()),
    ] {
        let err = registry.chart(target, None).expect_err("anchor must fail");
        assert!(matches!(err, ChartError::InvalidArgument(_)));
    }
}

#[test]
fn child_chart_shares_parent_root_and_stays_out_of_group() {
    let registry = ChartRegistry::new();
    let (parent, root) = anchored_chart(&registry, 80.0, 90.0);
    let child = registry.chart(&parent, None).expect("child");

    let group = registry.default_group();
    assert!(child.is_child());
    assert!(!group.has_chart(&child));
    assert_eq!(group.charts(), vec![parent.clone()]);
    assert_eq!(child.root_element(), Some(root));
    assert_eq!(child.width().expect("width"), 200.0);
    assert_eq!(child.primary_chart_id(), parent.id().clone());
    assert!(child.reset_surface().is_err());
}

#[test]
fn anchoring_to_own_child_is_rejected() {
    let registry = ChartRegistry::new();
    let (parent, _) = anchored_chart(&registry, 300.0, 200.0);
    let child = registry.chart(&parent, None).expect("child");

    let err = parent.set_anchor(&child).expect_err("cycle");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
    assert!(parent.is_root());
}

#[test]
fn re_anchoring_root_as_child_leaves_group() {
    let registry = ChartRegistry::new();
    let (host, _) = anchored_chart(&registry, 300.0, 200.0);
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);
    assert_eq!(registry.default_group().len(), 2);

    chart.set_anchor(&host).expect("re-anchor");
    assert!(!registry.default_group().has_chart(&chart));
    assert_eq!(registry.default_group().len(), 1);
}

#[test]
fn set_chart_group_moves_membership() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);
    let other = registry.group(Some("other"));

    chart.set_chart_group(&other).expect("move");

    assert!(!registry.default_group().has_chart(&chart));
    assert!(other.has_chart(&chart));
    assert_eq!(chart.chart_group(), other);
}

#[test]
fn disposed_chart_fails_fast_and_leaves_group() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);
    let log = Log::default();
    record_events(&chart, &log);

    chart.render().expect("render");
    chart.dispose();
    registry.scheduler().run_until_idle();

    assert_eq!(chart.phase(), LifecyclePhase::Disposed);
    assert!(!registry.default_group().has_chart(&chart));
    assert!(!log.borrow().contains(&"postRender".to_owned()));
    let results = [
        chart.render(),
        chart.redraw(),
        chart.set_filter(None).map(|_| ()),
        chart.filter().map(|_| ()),
        chart.filters().map(|_| ()),
        chart.has_filter(None).map(|_| ()),
        chart.on("zoomed.late", |_: &Chart, _: &EventDetail| {}).map(|_| ()),
        chart.off(".test").map(|_| ()),
        chart.invoke_zoomed(),
        chart.turn_on_controls().map(|_| ()),
        chart.turn_off_controls().map(|_| ()),
        chart.set_drawer(NullDrawer).map(|_| ()),
        chart.set_commit_handler(|_: bool, _: CommitCallback| {}).map(|_| ()),
        chart.clear_commit_handler().map(|_| ()),
        chart.set_key_accessor(|_| None).map(|_| ()),
        chart.set_filter_printer(|filter: &Filter| format!("{filter:?}")).map(|_| ()),
        chart
            .set_legend(RecordingLegend {
                log: log.clone(),
                parent: None,
            })
            .map(|_| ()),
    ];
    for result in results {
        assert!(matches!(result, Err(ChartError::InvalidState(_))));
    }
    assert!(!chart.has_legend());
    chart.dispose();
}

struct SwappingDrawer {
    log: Log,
}

impl ChartDrawer for SwappingDrawer {
    fn draw(&mut self, chart: &Chart) -> ChartResult<()> {
        let nested = chart.render();
        self.log.borrow_mut().push(format!(
            "nested render rejected: {}",
            matches!(nested, Err(ChartError::InvalidState(_)))
        ));
        chart.set_drawer(RecordingDrawer {
            log: self.log.clone(),
        })?;
        Ok(())
    }
}

#[test]
fn drawer_may_call_back_into_its_chart() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);
    chart.configure(json!({"transitionDuration": 0})).expect("configure");
    let log = Log::default();
    chart
        .set_drawer(SwappingDrawer { log: log.clone() })
        .expect("drawer");

    chart.render().expect("render");
    chart.redraw().expect("redraw");

    assert_eq!(*log.borrow(), vec!["nested render rejected: true", "update"]);
}

struct ObservingLegend {
    chart: WeakChart,
    seen: Log,
}

impl Legend for ObservingLegend {
    fn set_parent(&mut self, chart: &Chart) {
        self.chart = chart.weak();
    }

    fn render(&mut self) -> ChartResult<()> {
        if let Some(chart) = self.chart.upgrade() {
            let width = chart.width()?;
            let filters = chart.filters()?;
            self.seen
                .borrow_mut()
                .push(format!("legend {width} {}", filters.len()));
        }
        Ok(())
    }
}

#[test]
fn legend_holding_weak_parent_does_not_keep_chart_alive() {
    let registry = ChartRegistry::new();
    let seen = Log::default();
    let handle = {
        let (chart, _) = anchored_chart(&registry, 300.0, 200.0);
        chart.configure(json!({"transitionDuration": 0})).expect("configure");
        chart
            .set_legend(ObservingLegend {
                chart: WeakChart::default(),
                seen: seen.clone(),
            })
            .expect("legend");
        chart.set_filter(Some(Filter::key("a"))).expect("filter");
        chart.render().expect("render");
        assert!(chart.has_legend());
        chart.weak()
    };

    assert_eq!(*seen.borrow(), vec!["legend 300 1"]);
    assert!(handle.upgrade().is_none());
    assert!(registry.default_group().is_empty());
}

#[test]
fn dropped_charts_disappear_from_group() {
    let registry = ChartRegistry::new();
    let (keep, _) = anchored_chart(&registry, 300.0, 200.0);
    {
        let _temporary = anchored_chart(&registry, 300.0, 200.0);
        assert_eq!(registry.default_group().len(), 2);
    }
    assert_eq!(registry.default_group().charts(), vec![keep]);
}

#[test]
fn listeners_replace_by_namespace_and_remove_across_events() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);
    let hits = Rc::new(RefCell::new(Vec::new()));

    for label in ["first", "second"] {
        let sink = hits.clone();
        chart
            .on("zoomed.axis", move |_: &Chart, _: &EventDetail| {
                sink.borrow_mut().push(label)
            })
            .expect("on");
    }
    let sink = hits.clone();
    chart
        .on("renderlet.axis", move |_: &Chart, _: &EventDetail| {
            sink.borrow_mut().push("renderlet")
        })
        .expect("on");

    chart.invoke_zoomed().expect("zoomed");
    assert_eq!(*hits.borrow(), vec!["second"]);

    assert_eq!(chart.off(".axis").expect("off"), 2);
    assert_eq!(chart.listener_count(ChartEvent::Zoomed), 0);
    assert_eq!(chart.listener_count(ChartEvent::Renderlet), 0);
    assert!(chart.on("clicked", |_: &Chart, _: &EventDetail| {}).is_err());
}

#[test]
fn options_reject_unknown_keys_before_applying() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);

    let err = chart
        .options(json!({"width": 120, "wobble": true}))
        .expect_err("unknown key");
    assert!(matches!(err, ChartError::InvalidArgument(_)));
    assert_eq!(chart.width().expect("width"), 300.0);

    chart
        .options(json!({"width": 120, "minHeight": 50, "controlsUseVisibility": true}))
        .expect("options");
    assert_eq!(chart.width().expect("width"), 120.0);
    assert_eq!(chart.config().min_height(), 50.0);
    assert!(chart.config().controls_use_visibility());
}

#[test]
fn configure_keeps_unknown_keys() {
    let registry = ChartRegistry::new();
    let (chart, _) = anchored_chart(&registry, 300.0, 200.0);

    chart
        .configure(json!({"ordinalColors": ["#111", "#222"]}))
        .expect("configure");
    chart.configure(json!({"minWidth": 10})).expect("configure");

    let config = chart.config();
    assert_eq!(config.get("ordinalColors"), Some(&json!(["#111", "#222"])));
    assert_eq!(config.min_width(), 10.0);
}
