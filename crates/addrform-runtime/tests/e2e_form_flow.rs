//! E2E: scripted form sessions through `FormSimulator`.
//!
//! Covers the user-visible contract end to end:
//! 1. Keystrokes always render; validation waits for a quiet window.
//! 2. IME composition holds validation back until commit.
//! 3. A commit always reaches the pipeline, deduplicated against the last
//!    evaluation.
//! 4. Submit is a no-op while invalid.
//! 5. Closing the form freezes the validity flag.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use addrform_core::{Field, FormSnapshot};
use addrform_runtime::simulator::FormSimulator;
use addrform_runtime::{PipelineConfig, SubmitOutcome};
use web_time::Duration;

const KEY_GAP: Duration = Duration::from_millis(40);
const WINDOW: Duration = Duration::from_millis(150);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("addrform_runtime=trace"))
        .with_test_writer()
        .try_init();
}

/// Fill every required field with plain (non-IME) edits and settle.
fn fill_shinjuku(sim: &mut FormSimulator) {
    sim.edit(Field::PostalCode, "1600023");
    sim.edit(Field::Prefecture, "東京都");
    sim.edit(Field::City, "新宿区");
    sim.edit(Field::Town, "西新宿");
    sim.advance(WINDOW);
}

// ── 1. Rendering vs. validation ─────────────────────────────────────────

#[test]
fn every_keystroke_renders_immediately() {
    init_tracing();
    let mut sim = FormSimulator::new();
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&rendered);
    let _sub = sim
        .form()
        .subscribe_snapshot(move |s: &FormSnapshot| sink.borrow_mut().push(s.postal_code().to_owned()));

    sim.type_text(Field::PostalCode, "160", KEY_GAP);
    assert_eq!(*rendered.borrow(), vec!["", "1", "16", "160"]);
    assert!(sim.evaluations().is_empty());
}

#[test]
fn complete_address_validates_once() {
    let mut sim = FormSimulator::new();
    fill_shinjuku(&mut sim);
    assert_eq!(sim.evaluations(), vec![true]);
    assert!(sim.form().can_submit());
}

#[test]
fn six_digit_postal_code_is_not_enough() {
    let mut sim = FormSimulator::new();
    sim.edit(Field::PostalCode, "123456");
    sim.edit(Field::Prefecture, "東京都");
    sim.edit(Field::City, "新宿区");
    sim.edit(Field::Town, "西新宿");
    sim.advance(WINDOW);
    assert_eq!(sim.evaluations(), vec![false]);
}

#[test]
fn building_edit_revalidates_without_changing_result() {
    let mut sim = FormSimulator::new();
    fill_shinjuku(&mut sim);
    sim.edit(Field::Building, "都庁第一本庁舎");
    sim.advance(WINDOW);
    assert_eq!(sim.evaluations(), vec![true, true]);
}

#[test]
fn rejected_postal_edit_is_silent() {
    let mut sim = FormSimulator::new();
    sim.edit(Field::PostalCode, "160");
    let before = sim.snapshot();
    assert!(!sim.edit(Field::PostalCode, "12a45"));
    assert_eq!(sim.snapshot(), before);
}

// ── 2-3. Composition ────────────────────────────────────────────────────

#[test]
fn long_composition_defers_validation_until_commit() {
    let mut sim = FormSimulator::new();
    sim.edit(Field::PostalCode, "1600023");
    sim.edit(Field::Prefecture, "東京都");
    sim.edit(Field::Town, "西新宿");
    sim.advance(WINDOW);
    assert_eq!(sim.evaluations(), vec![false]);

    // Composition spans several windows; none of it is validated.
    sim.compose(
        Field::City,
        &["し", "しん", "しんじゅく", "新宿", "新宿く"],
        "新宿区",
        Duration::from_millis(200),
    );
    assert_eq!(sim.evaluations(), vec![false]);
    assert_eq!(sim.snapshot().city(), "新宿区");

    sim.advance(WINDOW);
    assert_eq!(sim.evaluations(), vec![false, true]);
}

#[test]
fn commit_equal_to_pre_composition_value_is_published_but_deduplicated() {
    let mut sim = FormSimulator::new();
    fill_shinjuku(&mut sim);
    let published = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&published);
    let _sub = sim.form().subscribe_changes(move |_| *counter.borrow_mut() += 1);
    *published.borrow_mut() = 0;

    sim.compose(Field::Town, &["にししんじゅく"], "西新宿", KEY_GAP);
    assert_eq!(*published.borrow(), 1);

    sim.advance(WINDOW);
    assert_eq!(sim.evaluations(), vec![true]);
    assert_eq!(sim.stats().suppressed, 1);
}

#[test]
fn commit_without_start_still_publishes() {
    let mut sim = FormSimulator::new();
    sim.edit(Field::PostalCode, "1600023");
    sim.edit(Field::Prefecture, "東京都");
    sim.edit(Field::City, "新宿区");
    sim.form_mut().on_composition_end(Field::Town, "西新宿");
    assert!(!sim.form().is_composing());
    sim.advance(WINDOW);
    assert_eq!(sim.evaluations(), vec![true]);
}

// ── 4. Submit ───────────────────────────────────────────────────────────

#[test]
fn submit_while_invalid_is_a_no_op() {
    let mut sim = FormSimulator::new();
    sim.edit(Field::PostalCode, "1600023");
    sim.advance(WINDOW);
    assert_eq!(sim.submit(), SubmitOutcome::Ignored);
}

#[test]
fn submit_carries_current_snapshot() {
    let mut sim = FormSimulator::new();
    fill_shinjuku(&mut sim);
    match sim.submit() {
        SubmitOutcome::Accepted(snapshot) => {
            assert_eq!(snapshot.postal_code(), "1600023");
            assert_eq!(snapshot.town(), "西新宿");
        }
        SubmitOutcome::Ignored => panic!("complete address should submit"),
    }
}

// ── 5. Teardown ─────────────────────────────────────────────────────────

#[test]
fn close_then_wait_does_not_change_flag() {
    init_tracing();
    let mut sim = FormSimulator::new();
    sim.edit(Field::PostalCode, "1600023");
    sim.edit(Field::Prefecture, "東京都");
    sim.edit(Field::City, "新宿区");
    sim.edit(Field::Town, "西新宿");
    sim.form_mut().close();

    sim.advance(WINDOW * 10);
    assert!(!sim.is_valid());
    assert!(sim.evaluations().is_empty());
}

#[test]
fn configured_window_is_honoured() {
    let mut sim = FormSimulator::with_config(
        PipelineConfig::default().with_debounce(Duration::from_millis(500)),
    );
    fill_shinjuku(&mut sim); // advances only 150ms
    assert!(sim.evaluations().is_empty());
    sim.advance(Duration::from_millis(350));
    assert_eq!(sim.evaluations(), vec![true]);
}
