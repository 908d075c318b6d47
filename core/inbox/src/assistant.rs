//! Chat front-end: turns messages and button presses into store operations
//! and renders the replies.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use idea_inbox_schemas::{Item, ItemId, ItemKind, OwnerId};

use crate::classifier::ItemClassifier;
use crate::commands::{Callback, Command, ListView, MenuAction};
use crate::database::Database;
use crate::error::StoreResult;
use crate::pagination::{paginate, PageRequest};
use crate::rate_limit::RateLimiter;
use crate::repository::{EntityKind, IdeaRepository, ItemRepository, TaskRepository, ORDINAL_WINDOW};
use crate::settings::{SettingsDefaults, SettingsRepository};
use crate::validation::{ContentValidator, ValidationError};

const PREVIEW_CHARS: usize = 60;

const APOLOGY: &str = "Sorry, something went wrong on our side. Please try again.";
const RATE_LIMITED: &str = "Too many requests. Please wait a minute and try again.";

const HELP_TEXT: &str = "Commands:
/save <text> - save an idea
/task <text> - save a task
/list [page] - your ideas
/tasks [page] - your tasks
/today - what you saved today
/done <n> - mark task n as done
/undo <n> - reopen task n
/edit <n> <text> - reword idea n
/stats - totals and streak
/digest HH:MM - daily digest time

Plain messages are saved as ideas, or as tasks when they read like one.
Start a message with \"idea:\" or \"task:\" to choose yourself.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    fn new(label: impl Into<String>, callback: Callback) -> Self {
        Self {
            label: label.into(),
            data: callback.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub page_size: usize,
    pub settings: SettingsDefaults,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            page_size: 5,
            settings: SettingsDefaults::default(),
        }
    }
}

pub struct Assistant {
    db: Database,
    limiter: Box<dyn RateLimiter>,
    classifier: ItemClassifier,
    validator: ContentValidator,
    options: AssistantOptions,
}

impl Assistant {
    pub fn new(db: Database, limiter: Box<dyn RateLimiter>, options: AssistantOptions) -> Self {
        Self {
            db,
            limiter,
            classifier: ItemClassifier::new(),
            validator: ContentValidator::default(),
            options,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> SettingsRepository<'_> {
        SettingsRepository::with_defaults(&self.db, self.options.settings.clone())
    }

    /// Handle a text message from the chat transport
    pub fn handle_message(&mut self, owner_id: OwnerId, text: &str) -> Reply {
        if let Some(rejected) = self.admit(owner_id) {
            return rejected;
        }

        let command = Command::parse(text, self.options.page_size);
        self.recover(owner_id, |assistant| assistant.dispatch(owner_id, command))
    }

    /// Handle an inline-button press
    pub fn handle_callback(&mut self, owner_id: OwnerId, data: &str) -> Reply {
        if let Some(rejected) = self.admit(owner_id) {
            return rejected;
        }

        let Some(callback) = Callback::parse(data, self.options.page_size) else {
            warn!("Unrecognised callback data from owner {}: {:?}", owner_id, data);
            return Reply::text("This button is no longer valid.");
        };

        self.recover(owner_id, |assistant| match callback {
            Callback::List(view) => assistant.list(owner_id, view),
            Callback::Done { kind, id } => assistant.toggle_by_id(owner_id, kind, id, true),
            Callback::Undo { kind, id } => assistant.toggle_by_id(owner_id, kind, id, false),
        })
    }

    fn admit(&mut self, owner_id: OwnerId) -> Option<Reply> {
        if let Err(err) = self.validator.validate_owner_id(owner_id) {
            warn!("Rejected request: {}", err);
            return Some(Reply::text("Unknown user."));
        }
        if !self.limiter.is_allowed(owner_id) {
            return Some(Reply::text(RATE_LIMITED));
        }
        None
    }

    fn recover<F>(&mut self, owner_id: OwnerId, op: F) -> Reply
    where
        F: FnOnce(&mut Self) -> StoreResult<Reply>,
    {
        match op(self) {
            Ok(reply) => reply,
            Err(err) => {
                error!("Request from owner {} failed: {}", owner_id, err);
                Reply::text(APOLOGY)
            }
        }
    }

    fn dispatch(&mut self, owner_id: OwnerId, command: Command) -> StoreResult<Reply> {
        match command {
            Command::Start => self.start(owner_id),
            Command::Help | Command::Menu(MenuAction::Help) => Ok(Reply::text(HELP_TEXT)),
            Command::Save { kind, content } => self.save(owner_id, kind, &content),
            Command::Text(text) => self.save_text(owner_id, &text),
            Command::List(view) => self.list(owner_id, view),
            Command::Menu(MenuAction::MyIdeas) => self.list(
                owner_id,
                ListView {
                    kind: ItemKind::Idea,
                    page: PageRequest::first(self.options.page_size),
                },
            ),
            Command::Today | Command::Menu(MenuAction::Today) => self.today(owner_id),
            Command::Menu(MenuAction::Done) => self.done_list(owner_id),
            Command::Stats | Command::Menu(MenuAction::Stats) => self.stats(owner_id),
            Command::Done(n) => self.toggle_by_ordinal(owner_id, n, true),
            Command::Undo(n) => self.toggle_by_ordinal(owner_id, n, false),
            Command::Edit { ordinal, content } => self.edit(owner_id, ordinal, &content),
            Command::Digest(time) => {
                let settings = self.settings().update_digest(owner_id, &time, None)?;
                Ok(Reply::text(format!(
                    "Daily digest set to {} ({}).",
                    settings.digest_time, settings.timezone
                )))
            }
            Command::Usage(usage) => Ok(Reply::text(format!("Usage: {}", usage))),
            Command::Unknown(name) => Ok(Reply::text(format!(
                "Unknown command /{}. Send /help for the list.",
                name
            ))),
        }
    }

    fn start(&mut self, owner_id: OwnerId) -> StoreResult<Reply> {
        self.settings().get_or_create(owner_id)?;
        info!("Owner {} started the assistant", owner_id);

        let first_page = |kind| {
            Callback::List(ListView {
                kind,
                page: PageRequest::first(self.options.page_size),
            })
        };
        Ok(Reply::text(format!(
            "Welcome! Send me any thought and I will keep it.\n\n{}",
            HELP_TEXT
        ))
        .with_buttons(vec![
            Button::new(MenuAction::MyIdeas.label(), first_page(ItemKind::Idea)),
            Button::new("📋 My tasks", first_page(ItemKind::Task)),
        ]))
    }

    fn save_text(&mut self, owner_id: OwnerId, text: &str) -> StoreResult<Reply> {
        if let Err(err) = self.validator.validate(text) {
            return Ok(rejection(&err));
        }
        let classified = self.classifier.classify(&self.validator.sanitize(text));
        self.store(owner_id, classified.kind, &classified.content)
    }

    fn save(&mut self, owner_id: OwnerId, kind: ItemKind, content: &str) -> StoreResult<Reply> {
        if let Err(err) = self.validator.validate(content) {
            return Ok(rejection(&err));
        }
        let sanitized = self.validator.sanitize(content);
        self.store(owner_id, kind, &sanitized)
    }

    fn store(&mut self, owner_id: OwnerId, kind: ItemKind, content: &str) -> StoreResult<Reply> {
        // Tags can sanitize down to nothing, as can a bare "task:" prefix
        if content.trim().is_empty() {
            return Ok(Reply::text("There is nothing to save in that message."));
        }

        let item = match kind {
            ItemKind::Idea => IdeaRepository::new(&self.db).create(owner_id, content, None, &[])?,
            ItemKind::Task => TaskRepository::new(&self.db).create(owner_id, content, None, &[])?,
        };
        let settings = self.settings().update_streak(owner_id, true)?;

        let noun = match kind {
            ItemKind::Idea => "Idea",
            ItemKind::Task => "Task",
        };
        Ok(Reply::text(format!(
            "{} saved at {}: {}\nStreak: {}",
            noun,
            item.created_at.format("%H:%M"),
            item.preview(100),
            settings.streak_count
        )))
    }

    fn list(&mut self, owner_id: OwnerId, view: ListView) -> StoreResult<Reply> {
        let items = match view.kind {
            ItemKind::Idea => IdeaRepository::new(&self.db).list_all(owner_id)?,
            ItemKind::Task => TaskRepository::new(&self.db).list_all(owner_id)?,
        };

        let (title, empty) = match view.kind {
            ItemKind::Idea => ("Your ideas", "You have no saved ideas yet."),
            ItemKind::Task => ("Your tasks", "You have no tasks yet."),
        };
        if items.is_empty() {
            return Ok(Reply::text(empty));
        }

        let page = paginate(&items, &view.page);
        if page.items.is_empty() {
            return Ok(Reply::text(format!(
                "There is no page {}. {} has {} page(s).",
                view.page.page_index.saturating_add(1),
                title,
                page.total_pages
            )));
        }

        let offset = page.offset(view.page.page_size);
        let mut text = format!(
            "{} (page {} of {}, {} total):\n\n",
            title,
            page.page_index.saturating_add(1),
            page.total_pages,
            page.total_items
        );
        let mut buttons = Vec::new();
        for (i, item) in page.items.iter().enumerate() {
            let position = offset + i + 1;
            text.push_str(&render_line(position, item));

            // Only the recent window is addressable by number, buttons carry ids
            if item.kind == ItemKind::Task {
                let (label, callback) = if item.is_done {
                    (format!("↩ {}", position), Callback::Undo { kind: item.kind, id: item.id })
                } else {
                    (format!("✅ {}", position), Callback::Done { kind: item.kind, id: item.id })
                };
                buttons.push(Button::new(label, callback));
            }
        }
        if page.total_items > ORDINAL_WINDOW && view.kind == ItemKind::Task {
            text.push_str(&format!(
                "\n/done and /undo reach the {} most recent tasks.",
                ORDINAL_WINDOW
            ));
        }

        let turn_to = |page_index| {
            Callback::List(ListView {
                kind: view.kind,
                page: PageRequest::new(view.page.page_size, page_index),
            })
        };
        if page.has_previous() {
            buttons.push(Button::new("⬅️ Prev", turn_to(page.page_index - 1)));
        }
        if page.has_next() {
            buttons.push(Button::new("Next ➡️", turn_to(page.page_index.saturating_add(1))));
        }

        Ok(Reply::text(text.trim_end()).with_buttons(buttons))
    }

    fn today(&mut self, owner_id: OwnerId) -> StoreResult<Reply> {
        let ideas = IdeaRepository::new(&self.db).list_today(owner_id)?;
        let tasks = TaskRepository::new(&self.db).list_today(owner_id)?;
        if ideas.is_empty() && tasks.is_empty() {
            return Ok(Reply::text("Nothing saved today yet."));
        }

        let mut text = format!("Today: {} idea(s), {} task(s)\n", ideas.len(), tasks.len());
        for item in ideas.iter().chain(tasks.iter()) {
            text.push_str(&format!(
                "\n{} {} {}",
                item.created_at.format("%H:%M"),
                kind_marker(item),
                item.preview(PREVIEW_CHARS)
            ));
        }
        Ok(Reply::text(text))
    }

    fn done_list(&mut self, owner_id: OwnerId) -> StoreResult<Reply> {
        let done = TaskRepository::new(&self.db).list_done(owner_id, ORDINAL_WINDOW)?;
        if done.is_empty() {
            return Ok(Reply::text("No completed tasks yet."));
        }

        let mut text = String::from("Recently completed:\n");
        let mut buttons = Vec::new();
        for item in &done {
            text.push_str(&format!("\n✅ {}", item.preview(PREVIEW_CHARS)));
            buttons.push(Button::new(
                format!("↩ {}", item.preview(20)),
                Callback::Undo { kind: item.kind, id: item.id },
            ));
        }
        Ok(Reply::text(text).with_buttons(buttons))
    }

    fn stats(&mut self, owner_id: OwnerId) -> StoreResult<Reply> {
        let ideas = IdeaRepository::new(&self.db).stats(owner_id)?;
        let tasks = TaskRepository::new(&self.db).stats(owner_id)?;
        let settings = self.settings().get_or_create(owner_id)?;

        Ok(Reply::text(format!(
            "Ideas: {} ({} today)\nTasks: {} total, {} done, {} pending ({} today)\nStreak: {}",
            ideas.total,
            ideas.today,
            tasks.total,
            tasks.done,
            tasks.pending,
            tasks.today,
            settings.streak_count
        )))
    }

    fn toggle_by_ordinal(&mut self, owner_id: OwnerId, n: usize, done: bool) -> StoreResult<Reply> {
        let tasks = TaskRepository::new(&self.db);
        let Some(task) = tasks.get_by_ordinal(owner_id, n)? else {
            return Ok(Reply::text(format!(
                "There is no task number {}. Numbers follow /tasks, newest first, up to {}.",
                n, ORDINAL_WINDOW
            )));
        };

        let changed = if done {
            tasks.mark_done(task.id, owner_id)?
        } else {
            tasks.undo(task.id, owner_id)?
        };
        Ok(toggle_reply(changed, done, &task))
    }

    fn toggle_by_id(&mut self, owner_id: OwnerId, kind: ItemKind, id: ItemId, done: bool) -> StoreResult<Reply> {
        match kind {
            ItemKind::Idea => set_done(&IdeaRepository::new(&self.db), owner_id, id, done),
            ItemKind::Task => set_done(&TaskRepository::new(&self.db), owner_id, id, done),
        }
    }

    fn edit(&mut self, owner_id: OwnerId, ordinal: usize, content: &str) -> StoreResult<Reply> {
        if let Err(err) = self.validator.validate(content) {
            return Ok(rejection(&err));
        }
        let content = self.validator.sanitize(content);
        if content.is_empty() {
            return Ok(Reply::text("The new text is empty."));
        }

        let ideas = IdeaRepository::new(&self.db);
        let Some(idea) = ideas.get_by_ordinal(owner_id, ordinal)? else {
            return Ok(Reply::text(format!("There is no idea number {}.", ordinal)));
        };

        if ideas.update_content(idea.id, owner_id, &content)? {
            Ok(Reply::text(format!("Idea {} updated: {}", ordinal, content)))
        } else {
            Ok(Reply::text(format!("There is no idea number {}.", ordinal)))
        }
    }
}

fn set_done<K: EntityKind>(
    repo: &ItemRepository<'_, K>,
    owner_id: OwnerId,
    id: ItemId,
    done: bool,
) -> StoreResult<Reply> {
    let Some(item) = repo.get_by_id(id, owner_id)? else {
        return Ok(Reply::text("That item no longer exists."));
    };
    let changed = if done {
        repo.mark_done(id, owner_id)?
    } else {
        repo.undo(id, owner_id)?
    };
    Ok(toggle_reply(changed, done, &item))
}

fn toggle_reply(changed: bool, done: bool, item: &Item) -> Reply {
    if !changed {
        return Reply::text("That item no longer exists.");
    }
    let verb = if done { "Done" } else { "Reopened" };
    Reply::text(format!("{}: {}", verb, item.preview(PREVIEW_CHARS)))
}

fn rejection(err: &ValidationError) -> Reply {
    warn!("Rejected message: {}", err);
    Reply::text(format!("Not saved: {}.", err))
}

fn kind_marker(item: &Item) -> &'static str {
    match (item.kind, item.is_done) {
        (ItemKind::Idea, _) => "💡",
        (ItemKind::Task, false) => "⬜",
        (ItemKind::Task, true) => "✅",
    }
}

fn render_line(position: usize, item: &Item) -> String {
    format!(
        "{}. {} {} ({})\n",
        position,
        kind_marker(item),
        item.preview(PREVIEW_CHARS),
        item.created_at.format("%d.%m.%Y %H:%M")
    )
}
