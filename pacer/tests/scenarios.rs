//! End-to-end scheduling scenarios driven by a manual clock.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=pacer=trace cargo test --features tracing --test scenarios -- --nocapture
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use pacer::CallbackResult;
use pacer::clock::ManualClock;
use pacer::timing::{EventHandle, Fire, Schedule, Scheduler, SchedulerConfig, Span, Tick};

static INIT_TRACING: Once = Once::new();

fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        pacer::init_tracing();
    });
}

type Log = Rc<RefCell<Vec<String>>>;

fn started_at(t: f64) -> (Scheduler<String, ManualClock>, ManualClock) {
    init_test_tracing();
    let clock = ManualClock::new(t);
    let mut s = Scheduler::new(clock.clone());
    s.start();
    (s, clock)
}

fn step(s: &mut Scheduler<String, ManualClock>, clock: &ManualClock, t: f64) -> usize {
    clock.set(t);
    s.update(t).fired
}

fn logging(log: &Log, name: &str) -> impl FnMut(&mut Fire<'_, String>) -> CallbackResult + use<> {
    let log = Rc::clone(log);
    let name = name.to_owned();
    move |fire: &mut Fire<'_, String>| -> CallbackResult {
        let mut entry = name.clone();
        for arg in fire.args() {
            entry.push(':');
            entry.push_str(arg);
        }
        log.borrow_mut().push(entry);
        Ok(())
    }
}

#[test]
fn relative_event_fires_once_then_leaves_the_queue() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();
    let h = s
        .add(100.0, Schedule::After, Vec::new(), logging(&log, "cb"))
        .unwrap();
    assert_eq!(s.event(h).unwrap().tick(), Tick::new(100));

    assert_eq!(step(&mut s, &clock, 50.0), 0);
    assert_eq!(step(&mut s, &clock, 120.0), 1);
    assert_eq!(*log.borrow(), vec!["cb"], "invoked once, with no arguments");
    assert!(s.event(h).is_some(), "still present until the next compaction");

    assert_eq!(step(&mut s, &clock, 140.0), 0);
    assert!(s.event(h).is_none());
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn equal_delays_fire_in_insertion_order() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();
    s.add(50.0, Schedule::After, vec!["1".into()], logging(&log, "a"))
        .unwrap();
    s.add(50.0, Schedule::After, vec!["2".into()], logging(&log, "b"))
        .unwrap();

    assert_eq!(step(&mut s, &clock, 60.0), 2);
    assert_eq!(*log.borrow(), vec!["a:1", "b:2"]);
}

#[test]
fn remove_before_any_update_means_no_invocation() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();
    let h = s
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "cb"))
        .unwrap();
    assert!(s.remove(h));

    for t in [0.0, 10.0, 20.0, 500.0] {
        step(&mut s, &clock, t);
    }
    assert!(log.borrow().is_empty());
    assert!(!s.remove(h), "remove is idempotent");
}

#[test]
fn remove_after_fire_reports_failure() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();
    let h = s
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "cb"))
        .unwrap();
    step(&mut s, &clock, 10.0);
    assert!(!s.remove(h));
}

#[test]
fn absolute_event_fires_at_its_timestamp() {
    let (mut s, clock) = started_at(1_000.0);
    let log = Log::default();
    s.add(1_250.0, Schedule::At, Vec::new(), logging(&log, "at"))
        .unwrap();
    assert_eq!(step(&mut s, &clock, 1_249.0), 0);
    assert_eq!(step(&mut s, &clock, 1_250.0), 1);
}

#[test]
fn callback_cancels_unvisited_sibling_without_disturbing_others() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();
    let victim: Rc<RefCell<Option<EventHandle>>> = Rc::default();

    let l = Rc::clone(&log);
    let v = Rc::clone(&victim);
    s.add(10.0, Schedule::After, Vec::new(), move |fire| {
        l.borrow_mut().push("canceller".into());
        if let Some(h) = *v.borrow() {
            assert!(fire.remove(h));
        }
        Ok(())
    })
    .unwrap();
    let h = s
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "victim"))
        .unwrap();
    *victim.borrow_mut() = Some(h);
    s.add(10.0, Schedule::After, Vec::new(), logging(&log, "sibling"))
        .unwrap();
    s.add(15.0, Schedule::After, Vec::new(), logging(&log, "later"))
        .unwrap();

    step(&mut s, &clock, 10.0);
    step(&mut s, &clock, 20.0);
    step(&mut s, &clock, 30.0);
    assert_eq!(*log.borrow(), vec!["canceller", "sibling", "later"]);
    assert!(s.event(h).is_none());
}

#[test]
fn callback_reschedules_itself() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();

    type Step = Box<dyn FnMut(&mut Fire<'_, String>) -> CallbackResult>;

    fn chain(log: Log, remaining: u32) -> Step {
        Box::new(move |fire: &mut Fire<'_, String>| -> CallbackResult {
            log.borrow_mut()
                .push(format!("{}@{}", remaining, fire.now().get()));
            if remaining > 1 {
                let next = chain(Rc::clone(&log), remaining - 1);
                fire.add(25.0, Schedule::After, Vec::new(), next)?;
            }
            Ok(())
        })
    }

    s.add(25.0, Schedule::After, Vec::new(), chain(Rc::clone(&log), 3))
        .unwrap();
    for t in (0..=10).map(|i| f64::from(i) * 10.0) {
        step(&mut s, &clock, t);
    }
    assert_eq!(*log.borrow(), vec!["3@30", "2@60", "1@90"]);
    assert!(s.is_expired());
}

#[test]
fn suspension_does_not_release_a_burst() {
    let (mut s, clock) = started_at(0.0);
    let log = Log::default();
    for (name, delay) in [("a", 100.0), ("b", 200.0), ("c", 300.0)] {
        s.add(delay, Schedule::After, Vec::new(), logging(&log, name))
            .unwrap();
    }
    step(&mut s, &clock, 50.0);

    // Ten seconds without a pass; everything would be overdue.
    let outcome = {
        clock.set(10_050.0);
        s.update(10_050.0)
    };
    assert!(outcome.corrected);
    assert_eq!(outcome.fired, 0);

    // Remaining times (50, 150, 250ms) carry over from the resume point.
    assert_eq!(step(&mut s, &clock, 10_100.0), 1);
    assert_eq!(step(&mut s, &clock, 10_200.0), 1);
    assert_eq!(step(&mut s, &clock, 10_300.0), 1);
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn custom_time_cap_controls_spike_detection() {
    init_test_tracing();
    let clock = ManualClock::new(0.0);
    let config = SchedulerConfig::default().with_time_cap(Span::from_millis(100));
    let mut s: Scheduler<String, _> = Scheduler::with_config(config, clock.clone()).unwrap();
    let log = Log::default();
    s.add(150.0, Schedule::After, Vec::new(), logging(&log, "cb"))
        .unwrap();
    s.start();

    step(&mut s, &clock, 0.0);
    // 200ms gap > 100ms cap: shifted to 350 instead of firing.
    assert_eq!(step(&mut s, &clock, 200.0), 0);
    assert_eq!(step(&mut s, &clock, 300.0), 0);
    assert_eq!(step(&mut s, &clock, 350.0), 1);
}

#[test]
fn independent_schedulers_do_not_interfere() {
    let (mut a, clock_a) = started_at(0.0);
    let (mut b, clock_b) = started_at(5_000.0);
    let log = Log::default();

    let ha = a
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "a"))
        .unwrap();
    let hb = b
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "b"))
        .unwrap();

    step(&mut a, &clock_a, 10.0);
    assert_eq!(*log.borrow(), vec!["a"]);
    assert!(b.event(hb).is_some_and(|e| !e.is_pending_delete()));
    assert!(!a.remove(ha));
    step(&mut b, &clock_b, 5_010.0);
    assert_eq!(*log.borrow(), vec!["a", "b"]);
}

#[test]
fn handle_from_another_scheduler_cancels_nothing() {
    let (mut a, _) = started_at(0.0);
    let (mut b, clock_b) = started_at(0.0);
    let log = Log::default();

    let ha = a
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "a"))
        .unwrap();
    let hb = b
        .add(10.0, Schedule::After, Vec::new(), logging(&log, "b"))
        .unwrap();
    assert_ne!(ha, hb);

    assert!(!b.remove(ha));
    assert!(b.event(ha).is_none());
    step(&mut b, &clock_b, 20.0);
    assert_eq!(*log.borrow(), vec!["b"]);
    assert!(a.remove(ha), "a's own event is untouched");
}
