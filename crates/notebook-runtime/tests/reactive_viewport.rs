#![forbid(unsafe_code)]

//! Integration tests for observables driving headless viewports.

use std::cell::RefCell;
use std::rc::Rc;

use notebook_runtime::{HeadlessViewport, Observable, ViewportEvents};
use proptest::prelude::*;
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::INFO)
        .try_init();
}

#[test]
fn listener_chain_sees_every_scroll() {
    init_tracing();
    let viewport = HeadlessViewport::new(400.0);
    let mirror = Observable::new(0.0_f64);
    let log = Rc::new(RefCell::new(Vec::new()));

    let mirror_clone = mirror.clone();
    let _scroll = viewport.on_scroll(Box::new(move |y| {
        mirror_clone.set(y);
    }));
    let log_clone = Rc::clone(&log);
    let _mirror = mirror.subscribe(move |y| log_clone.borrow_mut().push(*y));

    for y in [100.0, 250.0, 250.0, 0.0] {
        viewport.scroll_to(y);
    }
    assert_eq!(*log.borrow(), vec![100.0, 250.0, 0.0]);
    assert_eq!(mirror.get(), viewport.scroll_top());
}

#[test]
fn every_registration_is_released() {
    init_tracing();
    let viewport = HeadlessViewport::new(400.0);
    let subs: Vec<_> = (0..4)
        .map(|_| viewport.on_resize(Box::new(|_| {})))
        .chain((0..3).map(|_| viewport.on_scroll(Box::new(|_| {}))))
        .collect();
    assert_eq!(viewport.resize_observer_count(), 4);
    assert_eq!(viewport.scroll_listener_count(), 3);

    drop(subs);
    assert_eq!(viewport.resize_observer_count(), 0);
    assert_eq!(viewport.scroll_listener_count(), 0);
}

proptest! {
    #[test]
    fn scroll_offset_is_always_sanitized(
        offsets in proptest::collection::vec(-1e6f64..1e6, 1..32),
    ) {
        let viewport = HeadlessViewport::new(400.0);
        for offset in offsets {
            viewport.scroll_to(offset);
            let top = viewport.scroll_top();
            prop_assert!(top.is_finite());
            prop_assert!(top >= 0.0);
        }
    }

    #[test]
    fn version_counts_distinct_writes(values in proptest::collection::vec(0u8..4, 0..64)) {
        let observable = Observable::new(0u8);
        let mut expected = 0u64;
        let mut current = 0u8;
        for value in values {
            if value != current {
                expected += 1;
                current = value;
            }
            observable.set(value);
        }
        prop_assert_eq!(observable.version(), expected);
    }
}
