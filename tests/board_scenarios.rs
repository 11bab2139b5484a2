//! End-to-end board behaviour against an in-memory store and a manual clock.

use std::collections::HashSet;

use kanban::history::HistoryAction;
use kanban::model::TimeLog;
use kanban::{
    Board, BoardConfig, BoardLayout, Clock, DropRequest, Error, ManualClock, MemoryStore, Status,
    TaskDraft,
};

fn new_board(clock: &ManualClock) -> Board<MemoryStore, &ManualClock> {
    Board::open(MemoryStore::new(), clock, BoardConfig::default())
}

fn actions<S: kanban::KeyValueStore>(board: &Board<S, &ManualClock>) -> Vec<HistoryAction> {
    board.history().iter().map(|entry| entry.action).collect()
}

#[test]
fn write_spec_manual_pause_accumulates_exactly() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);

    let task = board.create_task(TaskDraft::new("Write spec")).unwrap();
    assert_eq!(task.status, Status::Todo);
    assert_eq!(task.total_time, 0);

    board.move_task(&task.id, Status::Progress, None).unwrap();
    let t0 = clock.now_millis();
    board.start_timer(&task.id).unwrap();
    clock.advance_millis(5000);
    board.pause_timer(&task.id).unwrap();

    let task = board.task(&task.id).unwrap();
    assert_eq!(task.total_time, 5000);
    assert!(!task.is_tracking);
    assert_eq!(
        task.time_logs,
        vec![TimeLog {
            start: t0,
            end: Some(t0 + 5000)
        }]
    );

    // Created, then moved. The manual pause records nothing.
    assert_eq!(actions(&board), vec![HistoryAction::Moved, HistoryAction::Created]);
}

#[test]
fn moving_a_running_task_to_done_auto_stops() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    let task = board.create_task(TaskDraft::new("Write spec")).unwrap();
    board.move_task(&task.id, Status::Progress, None).unwrap();

    board.start_timer(&task.id).unwrap();
    clock.advance_millis(5000);
    board.pause_timer(&task.id).unwrap();

    board.start_timer(&task.id).unwrap();
    clock.advance_millis(1200);
    let outcome = board.move_task(&task.id, Status::Done, None).unwrap();
    assert_eq!(outcome.status_change.unwrap().auto_stopped_ms, Some(1200));

    let task = board.task(&task.id).unwrap();
    assert_eq!(task.status, Status::Done);
    assert!(!task.is_tracking);
    assert_eq!(task.total_time, 6200);
    assert_eq!(task.time_logs.len(), 2);
    assert!(task.time_logs.iter().all(|log| !log.is_open()));

    let history = board.history();
    assert_eq!(history[0].action, HistoryAction::Moved);
    assert_eq!(history[1].action, HistoryAction::Timer);
    assert_eq!(
        history[1].description,
        "Auto-stopped timer for \"Write spec\" (Moved to done)"
    );
    assert_eq!(history[0].description, "Moved \"Write spec\" from progress to done");
}

#[test]
fn backward_move_leaves_everything_byte_for_byte() {
    let clock = ManualClock::new();
    let store = MemoryStore::new();
    let mut board = Board::open(store.clone(), &clock, BoardConfig::default());
    let a = board.create_task(TaskDraft::new("a")).unwrap();
    let b = board.create_task(TaskDraft::new("b")).unwrap();
    board.move_task(&b.id, Status::Progress, None).unwrap();

    let tasks_before = store.raw("kanban-tasks");
    let history_before = store.raw("kanban-history");
    let state_before = board.state().clone();

    let err = board.move_task(&b.id, Status::Todo, Some(0)).unwrap_err();
    assert!(matches!(
        err,
        Error::PolicyViolation {
            from: Status::Progress,
            to: Status::Todo,
            ..
        }
    ));

    assert_eq!(board.state(), &state_before);
    assert_eq!(store.raw("kanban-tasks"), tasks_before);
    assert_eq!(store.raw("kanban-history"), history_before);
    assert_eq!(board.task(&a.id).unwrap().status, Status::Todo);
}

#[test]
fn export_then_import_reproduces_the_board() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    let a = board.create_task(TaskDraft::new("a").with_tags(["x"])).unwrap();
    let b = board.create_task(TaskDraft::new("b")).unwrap();
    board.move_task(&a.id, Status::Progress, None).unwrap();
    board.start_timer(&a.id).unwrap();
    clock.advance_millis(700);
    board.move_task(&b.id, Status::OnHold, None).unwrap();

    let document = board.export_snapshot().unwrap();
    let snapshot = board.state().clone();

    let mut other = new_board(&clock);
    other.create_task(TaskDraft::new("to be replaced")).unwrap();
    other.import_snapshot(&document).unwrap();

    assert_eq!(other.state(), &snapshot);
    assert!(other.task(&a.id).unwrap().is_tracking);
}

#[test]
fn drops_never_change_cardinality() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    let ids: Vec<String> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|content| board.create_task(TaskDraft::new(*content)).unwrap().id)
        .collect();

    let moves = [
        (0, Status::Progress, Some(0)),
        (1, Status::Progress, Some(0)),
        (2, Status::OnHold, None),
        (0, Status::Done, None),
        (3, Status::Todo, Some(0)),
        (4, Status::Done, Some(0)),
        (1, Status::OnHold, Some(1)),
        (2, Status::Todo, None),
        (2, Status::Progress, None),
    ];
    for (index, target, position) in moves {
        let _ = board.move_task(&ids[index], target, position);
        assert_eq!(board.tasks().len(), ids.len());
        let unique: HashSet<&str> = board.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(unique.len(), ids.len());
        assert!(board.tasks().iter().all(|task| task.timer_consistent()));
    }
}

#[test]
fn explicit_layout_drop_reorders_across_columns() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    let a = board.create_task(TaskDraft::new("a")).unwrap().id;
    let b = board.create_task(TaskDraft::new("b")).unwrap().id;
    let c = board.create_task(TaskDraft::new("c")).unwrap().id;

    let layout = BoardLayout {
        todo: vec![c.clone(), a.clone()],
        progress: vec![b.clone()],
        ..BoardLayout::default()
    };
    let outcome = board
        .change_status(&DropRequest {
            task_id: b.clone(),
            target: Status::Progress,
            layout,
        })
        .unwrap();
    assert!(outcome.order_changed);

    let order: Vec<&str> = board.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);
}

#[test]
fn layout_with_unknown_task_is_rejected() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    let a = board.create_task(TaskDraft::new("a")).unwrap().id;
    let before = board.state().clone();

    let mut layout = board.layout();
    layout.place(&a, Status::Progress, None).unwrap();
    layout.done.push("ghost".to_string());
    let err = board
        .change_status(&DropRequest {
            task_id: a,
            target: Status::Progress,
            layout,
        })
        .unwrap_err();
    assert!(matches!(err, Error::LayoutMismatch(_)));
    assert_eq!(board.state(), &before);
}

#[test]
fn live_elapsed_time_is_read_only() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    let id = board.create_task(TaskDraft::new("a")).unwrap().id;
    board.move_task(&id, Status::Progress, None).unwrap();
    board.start_timer(&id).unwrap();

    clock.advance_millis(2500);
    let before = board.state().clone();
    assert_eq!(board.effective_total(&id).unwrap(), 2500);
    assert_eq!(board.tracking_totals(), vec![(id.clone(), 2500)]);
    assert_eq!(board.state(), &before);
}

#[test]
fn unknown_ids_fail_without_side_effects() {
    let clock = ManualClock::new();
    let mut board = new_board(&clock);
    board.create_task(TaskDraft::new("a")).unwrap();
    let before = board.state().clone();

    assert!(matches!(board.start_timer("nope"), Err(Error::NotFound(_))));
    assert!(matches!(board.pause_timer("nope"), Err(Error::NotFound(_))));
    assert!(matches!(
        board.move_task("nope", Status::Done, None),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        board.edit_task("nope", TaskDraft::new("x")),
        Err(Error::NotFound(_))
    ));
    assert_eq!(board.state(), &before);
}
