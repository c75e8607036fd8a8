mod common;

use common::{open, plain_run};
use libxtc_navigator::cursor::{Cursor, Position, ScopeState};
use libxtc_navigator::data_source_spec::AccessMode;
use libxtc_navigator::error::CursorError;
use libxtc_navigator::step_cursor::StepState;

#[test]
fn indexed_advance_visits_every_event_then_exhausts() {
    let mut ds = open(vec![plain_run(54, &[4, 3])], "exp=xpptut15:run=54:idx");
    let n = ds.event_count().unwrap().unwrap();
    assert_eq!(n, 7);
    for expected in 0..n as i64 {
        let handle = ds.advance().unwrap();
        assert_eq!(handle.position().event, expected);
    }
    assert!(ds.advance().unwrap_err().is_exhausted());
    assert_eq!(ds.cursor().state(), ScopeState::Exhausted);
}

#[test]
fn indexed_jump_matches_advancing() {
    let runs = || vec![plain_run(54, &[5, 5])];
    let mut jumper = open(runs(), "exp=xpptut15:run=54:idx");
    for i in 0..10usize {
        let mut walker = open(runs(), "exp=xpptut15:run=54:idx");
        for _ in 0..=i {
            walker.advance().unwrap();
        }
        jumper.jump(i).unwrap();
        let walked = walker.current().unwrap();
        let jumped = jumper.current().unwrap();
        assert_eq!(walked.position(), jumped.position());
        assert_eq!(walked.time(), jumped.time());
    }

    // Time targets land on the same event as index targets
    let target = jumper.jump(6usize).unwrap().time();
    jumper.jump(0usize).unwrap();
    assert_eq!(jumper.jump(target).unwrap().position().event, 6);
    assert!(jumper.jump(10usize).unwrap_err().is_exhausted());
    assert!(jumper.jump(usize::MAX).unwrap_err().is_exhausted());
    assert!(matches!(
        jumper.jump((1u32, 2u32, 3u32)),
        Err(CursorError::JumpTargetInvalid(_))
    ));
}

#[test]
fn streamed_steps_are_visited_in_order() {
    let mut ds = open(vec![plain_run(54, &[3, 0, 2, 4])], "exp=xpptut15:run=54:smd");
    assert_eq!(ds.mode(), AccessMode::Stepped);
    let positions: Vec<Position> = ds.events().map(|evt| evt.position()).collect();
    assert_eq!(positions.len(), 9);
    for pair in positions.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        assert!(a.step < b.step || (a.step == b.step && b.event == a.event + 1));
    }
    assert_eq!(positions.first(), Some(&Position::new(0, 0, 0)));
    assert_eq!(positions.last(), Some(&Position::new(0, 3, 3)));
}

#[test]
fn streamed_jump_resumes_before_jump_position() {
    let mut ds = open(vec![plain_run(54, &[4, 4])], "exp=xpptut15:run=54:smd");
    ds.advance().unwrap();
    let before = ds.advance().unwrap();
    assert_eq!(before.position(), Position::new(0, 0, 1));

    let jumped = ds.jump(6usize).unwrap();
    assert_eq!(jumped.position().step, -1);
    assert_eq!(jumped.position().event, 6);
    match ds.cursor() {
        Cursor::Stepped(cursor) => assert_eq!(
            cursor.step_state(),
            StepState::Jumped {
                resume: Position::new(0, 0, 1)
            }
        ),
        _ => panic!("expected a streaming cursor"),
    }

    let resumed = ds.advance().unwrap();
    assert_eq!(resumed.position(), Position::new(0, 0, 2));
    assert_eq!(ds.events().count(), 5);
}

#[test]
fn step_iteration() {
    let mut ds = open(vec![plain_run(54, &[2, 3, 1])], "exp=xpptut15:run=54:smd");
    let mut seen = Vec::new();
    while let Some(step) = ds.next_step().unwrap() {
        let index = step.step();
        let events: Vec<i64> = step.map(|evt| evt.position().event).collect();
        seen.push((index, events));
    }
    assert_eq!(
        seen,
        vec![(0, vec![0, 1]), (1, vec![0, 1, 2]), (2, vec![0])]
    );
}

#[test]
fn indexed_run_stack() {
    let mut ds = open(
        vec![plain_run(54, &[2]), plain_run(55, &[3])],
        "exp=xpptut15:run=54-55:idx",
    );
    assert_eq!(ds.events().count(), 2);
    assert!(ds.next_run().unwrap());
    assert_eq!(ds.cursor().run_number(), Some(55));
    assert_eq!(ds.events().count(), 3);
    assert!(!ds.next_run().unwrap());
}

#[test]
fn live_replay_runs_until_feed_closes() {
    let mut ds = open(vec![plain_run(54, &[2, 3])], "exp=xpptut15:run=54");
    assert_eq!(ds.mode(), AccessMode::Live);
    assert!(ds.interrupt_handle().is_some());
    assert!(matches!(
        ds.jump(0usize),
        Err(CursorError::JumpUnsupported(AccessMode::Live))
    ));

    let events: Vec<i64> = ds.events().map(|evt| evt.position().event).collect();
    assert_eq!(events, vec![0, 1, 2, 3, 4]);
    assert_eq!(ds.cursor().state(), ScopeState::Exhausted);
    assert!(ds.scan_table().is_err());
    assert_eq!(ds.event_count().unwrap(), None);
}
