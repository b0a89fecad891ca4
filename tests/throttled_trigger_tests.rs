use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use linked_charts::core::Scheduler;
use linked_charts::interaction::ThrottledTrigger;
use proptest::prelude::*;

fn recorder() -> (Rc<RefCell<Vec<usize>>>, impl Fn(usize) -> Box<dyn FnOnce()>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let make = move |index: usize| {
        let sink = sink.clone();
        Box::new(move || sink.borrow_mut().push(index)) as Box<dyn FnOnce()>
    };
    (log, make)
}

#[test]
fn burst_within_window_runs_only_last_action() {
    let scheduler = Scheduler::new();
    let trigger = ThrottledTrigger::new(scheduler.clone());
    let (log, action) = recorder();
    let delay = Some(Duration::from_millis(40));

    for index in 0..5 {
        trigger.trigger(action(index), delay);
        scheduler.advance(Duration::from_millis(10));
    }
    assert!(log.borrow().is_empty());
    assert!(trigger.has_pending());

    scheduler.advance(Duration::from_millis(40));
    assert_eq!(*log.borrow(), vec![4]);
    assert!(!trigger.has_pending());
    assert!(scheduler.is_idle());
}

#[test]
fn quiescent_periods_each_run_their_final_action() {
    let scheduler = Scheduler::new();
    let trigger = ThrottledTrigger::new(scheduler.clone());
    let (log, action) = recorder();
    let delay = Some(Duration::from_millis(20));

    trigger.trigger(action(0), delay);
    trigger.trigger(action(1), delay);
    scheduler.advance(Duration::from_millis(25));
    trigger.trigger(action(2), delay);
    scheduler.advance(Duration::from_millis(25));

    assert_eq!(*log.borrow(), vec![1, 2]);
}

#[test]
fn zero_delay_is_immediate() {
    let trigger = ThrottledTrigger::new(Scheduler::new());
    let (log, action) = recorder();

    trigger.trigger(action(7), Some(Duration::ZERO));
    trigger.trigger(action(8), None);

    assert_eq!(*log.borrow(), vec![7, 8]);
    assert!(trigger.scheduler().is_idle());
}

#[test]
fn action_may_retrigger_itself() {
    let scheduler = Scheduler::new();
    let trigger = ThrottledTrigger::new(scheduler.clone());
    let hits = Rc::new(RefCell::new(0));

    let again = trigger.clone();
    let counter = hits.clone();
    trigger.trigger(
        move || {
            *counter.borrow_mut() += 1;
            let counter = counter.clone();
            again.trigger(
                move || *counter.borrow_mut() += 1,
                Some(Duration::from_millis(5)),
            );
        },
        Some(Duration::from_millis(5)),
    );

    assert_eq!(scheduler.run_until_idle(), 2);
    assert_eq!(*hits.borrow(), 2);
}

proptest! {
    #[test]
    fn only_last_trigger_in_window_executes_once(
        delay_ms in 1u64..500,
        gaps in prop::collection::vec(0.0f64..1.0, 1..32),
    ) {
        let scheduler = Scheduler::new();
        let trigger = ThrottledTrigger::new(scheduler.clone());
        let (log, action) = recorder();
        let delay = Duration::from_millis(delay_ms);

        for (index, gap) in gaps.iter().enumerate() {
            trigger.trigger(action(index), Some(delay));
            // Strictly inside the window opened by this call.
            let step = Duration::from_micros((gap * (delay_ms * 1000 - 1) as f64) as u64);
            scheduler.advance(step);
        }
        scheduler.run_until_idle();

        prop_assert_eq!(log.borrow().clone(), vec![gaps.len() - 1]);
    }
}
