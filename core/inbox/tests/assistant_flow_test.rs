use idea_inbox::{
    menu_label_variants, Assistant, AssistantOptions, Database, IdeaRepository, MenuAction,
    ReportingZone, SettingsRepository, SlidingWindowLimiter, TaskRepository,
};
use idea_inbox_schemas::{ItemKind, OwnerId};
use std::time::Duration;
use tempfile::TempDir;

fn assistant_at(temp_dir: &TempDir, max_requests: usize) -> Assistant {
    let db = Database::new(temp_dir.path().join("inbox.db"), ReportingZone::default()).unwrap();
    Assistant::new(
        db,
        Box::new(SlidingWindowLimiter::new(max_requests, Duration::from_secs(60))),
        AssistantOptions::default(),
    )
}

/// A short session: capture, list, complete, check stats
#[test]
fn test_capture_list_complete_session() {
    let temp_dir = TempDir::new().unwrap();
    let mut assistant = assistant_at(&temp_dir, 100);
    let owner = OwnerId(12345);

    let welcome = assistant.handle_message(owner, "/start");
    assert!(welcome.text.starts_with("Welcome!"));
    assert_eq!(welcome.buttons.len(), 2);
    assert_eq!(welcome.buttons[1].data, "list:task:0");

    assistant.handle_message(owner, "An app that maps quiet cafes");
    assistant.handle_message(owner, "Надо купить батарейки");
    assistant.handle_message(owner, "task: email the accountant");
    assistant.handle_message(owner, "idea: must try sourdough");

    let db = assistant.database();
    let ideas = IdeaRepository::new(db).list_by_owner(owner, 10).unwrap();
    let tasks = TaskRepository::new(db).list_by_owner(owner, 10).unwrap();
    let idea_texts: Vec<_> = ideas.iter().map(|i| i.content.as_str()).collect();
    let task_texts: Vec<_> = tasks.iter().map(|i| i.content.as_str()).collect();
    assert_eq!(idea_texts, vec!["must try sourdough", "An app that maps quiet cafes"]);
    assert_eq!(task_texts, vec!["email the accountant", "Надо купить батарейки"]);

    let reply = assistant.handle_message(owner, "/done 1");
    assert_eq!(reply.text, "Done: email the accountant");

    let listing = assistant.handle_message(owner, "/tasks");
    assert!(listing.text.contains("1. ✅ email the accountant"), "{}", listing.text);
    assert!(listing.text.contains("2. ⬜ Надо купить батарейки"), "{}", listing.text);

    let stats = assistant.handle_message(owner, "/stats");
    assert!(
        stats.text.contains("Tasks: 2 total, 1 done, 1 pending"),
        "{}",
        stats.text
    );
    assert!(stats.text.ends_with("Streak: 4"), "{}", stats.text);
}

#[test]
fn test_rate_limited_messages_leave_no_trace() {
    let temp_dir = TempDir::new().unwrap();
    let mut assistant = assistant_at(&temp_dir, 3);
    let owner = OwnerId(1);

    for n in 0..5 {
        assistant.handle_message(owner, &format!("Thought number {}", n));
    }

    assert_eq!(assistant.database().count_items(ItemKind::Idea).unwrap(), 3);
    let settings = SettingsRepository::new(assistant.database())
        .get_or_create(owner)
        .unwrap();
    assert_eq!(settings.streak_count, 3);

    // Another owner is unaffected
    let reply = assistant.handle_message(OwnerId(2), "My own idea");
    assert!(reply.text.starts_with("Idea saved"));
}

#[test]
fn test_label_rows_are_removable() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(temp_dir.path().join("inbox.db"), ReportingZone::default()).unwrap();
    let owner = OwnerId(4);

    // Rows an older client stored when a menu button was pressed
    let ideas = IdeaRepository::new(&db);
    ideas.create(owner, MenuAction::Stats.label(), None, &[]).unwrap();
    ideas.create(owner, "Мои идеи", None, &[]).unwrap();
    ideas.create(owner, "Stats are interesting", None, &[]).unwrap();
    TaskRepository::new(&db)
        .create(owner, MenuAction::Help.plain_label(), None, &[])
        .unwrap();

    let labels = menu_label_variants();
    assert_eq!(db.count_items_with_content(ItemKind::Idea, &labels).unwrap(), 2);
    assert_eq!(db.delete_items_with_content(ItemKind::Idea, &labels).unwrap(), 2);
    assert_eq!(db.delete_items_with_content(ItemKind::Task, &labels).unwrap(), 1);

    let remaining = ideas.list_by_owner(owner, 10).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "Stats are interesting");
}
