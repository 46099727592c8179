use chrono::{NaiveDate, NaiveTime, Weekday};
use daybook_core::cli::Invocation;
use daybook_core::commands::dispatch;
use daybook_core::day::TimeSlot;
use daybook_core::kv::{FileStore, KeyValueStore, MemoryStore};
use daybook_core::render::Renderer;
use daybook_core::task::{DayStatus, Mode, TaskState, TaskTemplate};
use daybook_core::template::WeeklyTemplate;
use daybook_core::tracker::{APP_STATE_KEY, CALENDAR_DATA_KEY, Tracker, WEEKLY_TEMPLATE_KEY};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn gym_template() -> WeeklyTemplate {
    let mut template = WeeklyTemplate::default();
    template.push(
        Weekday::Mon,
        TaskTemplate::timed("Gym", NaiveTime::from_hms_opt(7, 0, 0).expect("time"), None),
    );
    template
}

#[test]
fn file_store_task_lifecycle_survives_reopen() {
    let temp = tempdir().expect("tempdir");
    let day = date(2026, 10, 19);

    let (done_id, missed_id) = {
        let store = FileStore::open(temp.path()).expect("open store");
        let mut tracker = Tracker::new(store);
        let done_id = tracker.add_task(day).expect("add");
        let missed_id = tracker.add_task(day).expect("add");
        tracker.set_title(day, &done_id, "Write report").expect("title");
        tracker
            .set_time(day, &done_id, TimeSlot::Start, "08:15")
            .expect("time");
        tracker.mark_complete(day, &done_id, true).expect("complete");
        tracker
            .mark_incomplete(day, &missed_id, "meeting ran long")
            .expect("miss");
        (done_id, missed_id)
    };

    let store = FileStore::open(temp.path()).expect("reopen store");
    assert!(store.path_for(CALENDAR_DATA_KEY).exists());
    let tracker = Tracker::new(store);
    let record = tracker.date_data(day).expect("read");

    assert_eq!(record.status(), DayStatus::Partial);
    let done = record.task(&done_id).expect("done task");
    assert_eq!(done.title, "Write report");
    assert_eq!(done.start_time, NaiveTime::from_hms_opt(8, 15, 0));
    assert_eq!(done.state, TaskState::Completed);
    assert_eq!(
        record.task(&missed_id).and_then(|t| t.state.reason()),
        Some("meeting ran long")
    );
}

#[test]
fn projection_fills_future_monday_once() {
    let today = date(2026, 10, 19);
    let anchor = date(2026, 10, 29);
    let monday = date(2026, 10, 26);

    let mut tracker = Tracker::new(MemoryStore::new());
    tracker.save_weekly_template(&gym_template()).expect("save template");

    let filled = tracker.project_template(anchor, today).expect("project");
    assert_eq!(filled, vec![monday]);

    let record = tracker.date_data(monday).expect("read");
    assert_eq!(record.mode, Mode::Time);
    assert_eq!(record.tasks.len(), 1);
    assert_eq!(record.tasks[0].title, "Gym");

    let again = tracker.project_template(anchor, today).expect("project again");
    assert!(again.is_empty());
    assert_eq!(tracker.date_data(monday).expect("read").tasks.len(), 1);
}

#[test]
fn projection_skips_today_and_keeps_user_tasks() {
    // Monday 2026-10-19 is today; Tuesday already has a user task.
    let today = date(2026, 10, 19);
    let tuesday = date(2026, 10, 20);
    let mut template = gym_template();
    template.push(Weekday::Tue, TaskTemplate::simple("Laundry"));

    let mut tracker = Tracker::new(MemoryStore::new());
    tracker.save_weekly_template(&template).expect("save");
    let user_id = tracker.add_task(tuesday).expect("add");

    let filled = tracker.project_template(today, today).expect("project");
    assert!(filled.is_empty());
    assert!(tracker.date_data(today).expect("read").tasks.is_empty());
    let record = tracker.date_data(tuesday).expect("read");
    assert_eq!(record.tasks.len(), 1);
    assert_eq!(record.tasks[0].id, user_id);
}

#[test]
fn projected_tasks_are_independent_of_template() {
    let today = date(2026, 10, 19);
    let monday = date(2026, 11, 2);
    let mut tracker = Tracker::new(MemoryStore::new());
    tracker.save_weekly_template(&gym_template()).expect("save");
    tracker.project_template(monday, today).expect("project");

    let mut template = tracker.weekly_template().expect("load");
    template.monday[0].title = "Swim".to_string();
    tracker.save_weekly_template(&template).expect("save");
    tracker.clear_weekly_template().expect("clear");

    assert!(tracker.weekly_template().expect("load").is_empty());
    assert_eq!(tracker.date_data(monday).expect("read").tasks[0].title, "Gym");
}

#[test]
fn loads_data_written_by_browser_client() {
    let mut store = MemoryStore::new();
    store
        .set(
            CALENDAR_DATA_KEY,
            r#"{"2026-10-19":{"mode":"simple","tasks":[
                {"id":1729300000000,"title":"Call mom","completed":true,"incomplete":false,"editing":false},
                {"id":1729300000001,"title":"","completed":false,"incomplete":false,"reason":"","editing":true}
            ],"status":"partial"}}"#,
        )
        .expect("seed calendar");
    store
        .set(
            WEEKLY_TEMPLATE_KEY,
            r#"{"monday":[{"title":"Gym","startTime":"07:00"}],"tuesday":[],"wednesday":[],"thursday":[],"friday":[],"saturday":[],"sunday":[]}"#,
        )
        .expect("seed template");

    let mut tracker = Tracker::new(store);
    let day = date(2026, 10, 19);
    let record = tracker.date_data(day).expect("read");
    assert_eq!(record.mode, Mode::Simple);
    assert_eq!(record.tasks[0].id.as_str(), "1729300000000");
    assert_eq!(record.tasks[1].display_title(), "Untitled Task");
    assert_eq!(record.tasks[1].state, TaskState::Pending);

    let legacy_id = record.tasks[1].id.clone();
    tracker.mark_complete(day, &legacy_id, true).expect("complete");
    assert_eq!(tracker.date_data(day).expect("read").status(), DayStatus::Completed);

    let template = tracker.weekly_template().expect("template");
    assert_eq!(template.monday[0].start_time, NaiveTime::from_hms_opt(7, 0, 0));
}

#[test]
fn cli_dispatch_drives_the_selected_date() {
    let today = date(2026, 10, 19);
    let renderer = Renderer::plain(false);
    let mut tracker = Tracker::new(MemoryStore::new());

    let run = |tracker: &mut Tracker<MemoryStore>, command: &str, args: &[&str]| {
        let inv = Invocation {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        };
        dispatch(tracker, &renderer, inv, today)
    };

    run(&mut tracker, "select", &["tomorrow"]).expect("select");
    run(&mut tracker, "mode", &["simple"]).expect("mode");
    run(&mut tracker, "add", &["Buy", "milk"]).expect("add");
    run(&mut tracker, "add", &[]).expect("add");
    run(&mut tracker, "done", &["1"]).expect("done");

    let err = run(&mut tracker, "miss", &["2"]).expect_err("missing reason");
    assert!(format!("{err:#}").contains("reason is required"));
    run(&mut tracker, "miss", &["2", "store", "closed"]).expect("miss");

    let tomorrow = date(2026, 10, 20);
    let record = tracker.date_data(tomorrow).expect("read");
    assert_eq!(record.mode, Mode::Simple);
    assert_eq!(record.tasks[0].title, "Buy milk");
    assert_eq!(record.tasks[1].state.reason(), Some("store closed"));
    assert_eq!(record.status(), DayStatus::Partial);

    run(&mut tracker, "delete", &["1"]).expect("delete");
    assert_eq!(
        tracker.date_data(tomorrow).expect("read").status(),
        DayStatus::Missed
    );

    run(&mut tracker, "template", &["set", "wed", "06:30-07:00", "Run"]).expect("template set");
    run(&mut tracker, "template", &["apply"]).expect("template apply");
    let wednesday = tracker.date_data(date(2026, 10, 21)).expect("read");
    assert_eq!(wednesday.tasks[0].title, "Run");
    assert_eq!(wednesday.mode, Mode::Time);

    assert!(run(&mut tracker, "done", &["9"]).is_err());
}

#[test]
fn cli_works_over_mode_only_browser_app_state() {
    let today = date(2026, 10, 19);
    let mut store = MemoryStore::new();
    store
        .set(APP_STATE_KEY, r#"{"currentMode":"simple"}"#)
        .expect("seed app state");
    let mut tracker = Tracker::new(store);
    let renderer = Renderer::plain(false);

    let inv = Invocation {
        command: "add".to_string(),
        args: vec!["Stretch".to_string()],
    };
    dispatch(&mut tracker, &renderer, inv, today).expect("add on today");

    let record = tracker.date_data(today).expect("read");
    assert_eq!(record.mode, Mode::Simple);
    assert_eq!(record.tasks[0].title, "Stretch");
    assert_eq!(record.tasks[0].start_time, None);
}
