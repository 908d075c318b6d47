//! Parsing of chat input: slash commands, menu-button labels, plain text,
//! and the data strings attached to inline buttons.

use chrono::NaiveTime;
use std::fmt;

use idea_inbox_schemas::{ItemId, ItemKind};

use crate::pagination::PageRequest;

/// Buttons of the persistent reply keyboard. Pressing one sends its label as
/// a plain message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    MyIdeas,
    Stats,
    Today,
    Done,
    Help,
}

impl MenuAction {
    pub const ALL: [MenuAction; 5] = [
        MenuAction::MyIdeas,
        MenuAction::Stats,
        MenuAction::Today,
        MenuAction::Done,
        MenuAction::Help,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::MyIdeas => "📝 My ideas",
            MenuAction::Stats => "📊 Stats",
            MenuAction::Today => "📅 Today",
            MenuAction::Done => "✅ Done",
            MenuAction::Help => "❓ Help",
        }
    }

    /// Label without the leading emoji
    pub fn plain_label(&self) -> &'static str {
        match self {
            MenuAction::MyIdeas => "My ideas",
            MenuAction::Stats => "Stats",
            MenuAction::Today => "Today",
            MenuAction::Done => "Done",
            MenuAction::Help => "Help",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.label() == text || action.plain_label() == text)
    }
}

/// Labels the keyboard used in earlier Russian-language deployments
const LEGACY_MENU_LABELS: &[&str] = &[
    "📝 Мои идеи",
    "📊 Статистика",
    "📅 За сегодня",
    "✅ Выполненные",
    "❓ Помощь",
    "Мои идеи",
    "Статистика",
    "За сегодня",
    "Выполненные",
    "Помощь",
];

/// Every text a menu button ever sent, with and without emoji. Items with
/// exactly this content were saved by mistake.
pub fn menu_label_variants() -> Vec<&'static str> {
    let mut labels: Vec<&'static str> = MenuAction::ALL
        .iter()
        .flat_map(|action| [action.label(), action.plain_label()])
        .collect();
    labels.extend_from_slice(LEGACY_MENU_LABELS);
    labels
}

/// Which list to show and which page of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListView {
    pub kind: ItemKind,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Save { kind: ItemKind, content: String },
    List(ListView),
    Today,
    Done(usize),
    Undo(usize),
    Edit { ordinal: usize, content: String },
    Stats,
    Digest(String),
    Menu(MenuAction),
    /// Free text, classified before it is saved
    Text(String),
    /// Recognised command with bad arguments; carries the usage line
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(text: &str, page_size: usize) -> Self {
        let trimmed = text.trim();

        if let Some(action) = MenuAction::from_label(trimmed) {
            return Command::Menu(action);
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Text(trimmed.to_string());
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        // "/list@inbox_bot" addresses a specific bot in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "save" | "idea" => save(ItemKind::Idea, args, "/save <text>"),
            "task" => save(ItemKind::Task, args, "/task <text>"),
            "list" => list(ItemKind::Idea, args, page_size, "/list [page]"),
            "tasks" => list(ItemKind::Task, args, page_size, "/tasks [page]"),
            "today" => Command::Today,
            "stats" => Command::Stats,
            "done" => match parse_ordinal(args) {
                Some(n) => Command::Done(n),
                None => Command::Usage("/done <number>"),
            },
            "undo" => match parse_ordinal(args) {
                Some(n) => Command::Undo(n),
                None => Command::Usage("/undo <number>"),
            },
            "edit" => {
                let parsed = args
                    .split_once(char::is_whitespace)
                    .and_then(|(n, content)| Some((parse_ordinal(n)?, content.trim())))
                    .filter(|(_, content)| !content.is_empty());
                match parsed {
                    Some((ordinal, content)) => Command::Edit {
                        ordinal,
                        content: content.to_string(),
                    },
                    None => Command::Usage("/edit <number> <text>"),
                }
            }
            "digest" => match NaiveTime::parse_from_str(args, "%H:%M") {
                Ok(time) => Command::Digest(time.format("%H:%M").to_string()),
                Err(_) => Command::Usage("/digest HH:MM"),
            },
            _ => Command::Unknown(name),
        }
    }
}

fn save(kind: ItemKind, args: &str, usage: &'static str) -> Command {
    if args.is_empty() {
        Command::Usage(usage)
    } else {
        Command::Save {
            kind,
            content: args.to_string(),
        }
    }
}

fn list(kind: ItemKind, args: &str, page_size: usize, usage: &'static str) -> Command {
    // Users count pages from 1
    let page_index = if args.is_empty() {
        0
    } else {
        match parse_ordinal(args) {
            Some(page) => page - 1,
            None => return Command::Usage(usage),
        }
    };
    Command::List(ListView {
        kind,
        page: PageRequest::new(page_size, page_index),
    })
}

/// A positive number
fn parse_ordinal(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Data carried by an inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    List(ListView),
    Done { kind: ItemKind, id: ItemId },
    Undo { kind: ItemKind, id: ItemId },
}

impl Callback {
    pub fn parse(data: &str, page_size: usize) -> Option<Self> {
        let mut parts = data.trim().splitn(3, ':');
        let action = parts.next()?;
        let kind = ItemKind::parse(parts.next()?)?;
        let value = parts.next()?;

        match action {
            "list" => Some(Callback::List(ListView {
                kind,
                page: PageRequest::new(page_size, value.parse().ok()?),
            })),
            "done" => Some(Callback::Done {
                kind,
                id: ItemId(value.parse().ok()?),
            }),
            "undo" => Some(Callback::Undo {
                kind,
                id: ItemId(value.parse().ok()?),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::List(view) => write!(f, "list:{}:{}", view.kind, view.page.page_index),
            Callback::Done { kind, id } => write!(f, "done:{}:{}", kind, id),
            Callback::Undo { kind, id } => write!(f, "undo:{}:{}", kind, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_and_menu_labels() {
        assert_eq!(
            Command::parse("  Launch a newsletter ", 5),
            Command::Text("Launch a newsletter".into())
        );
        assert_eq!(
            Command::parse("📊 Stats", 5),
            Command::Menu(MenuAction::Stats)
        );
        assert_eq!(Command::parse("Help", 5), Command::Menu(MenuAction::Help));
    }

    #[test]
    fn test_save_and_task() {
        assert_eq!(
            Command::parse("/save Write a blog post", 5),
            Command::Save {
                kind: ItemKind::Idea,
                content: "Write a blog post".into()
            }
        );
        assert_eq!(
            Command::parse("/task@inbox_bot Renew passport", 5),
            Command::Save {
                kind: ItemKind::Task,
                content: "Renew passport".into()
            }
        );
        assert_eq!(Command::parse("/save", 5), Command::Usage("/save <text>"));
    }

    #[test]
    fn test_list_pages_are_one_based() {
        let view = |kind, page_index| {
            Command::List(ListView {
                kind,
                page: PageRequest::new(5, page_index),
            })
        };
        assert_eq!(Command::parse("/list", 5), view(ItemKind::Idea, 0));
        assert_eq!(Command::parse("/list 3", 5), view(ItemKind::Idea, 2));
        assert_eq!(Command::parse("/tasks 1", 5), view(ItemKind::Task, 0));
        assert_eq!(Command::parse("/list 0", 5), Command::Usage("/list [page]"));
        assert_eq!(Command::parse("/tasks x", 5), Command::Usage("/tasks [page]"));
    }

    #[test]
    fn test_ordinal_commands() {
        assert_eq!(Command::parse("/done 2", 5), Command::Done(2));
        assert_eq!(Command::parse("/undo 10", 5), Command::Undo(10));
        assert_eq!(Command::parse("/done", 5), Command::Usage("/done <number>"));
        assert_eq!(Command::parse("/done -1", 5), Command::Usage("/done <number>"));
        assert_eq!(
            Command::parse("/edit 1   Better wording", 5),
            Command::Edit {
                ordinal: 1,
                content: "Better wording".into()
            }
        );
        assert_eq!(Command::parse("/edit 1", 5), Command::Usage("/edit <number> <text>"));
    }

    #[test]
    fn test_digest_time() {
        assert_eq!(Command::parse("/digest 7:05", 5), Command::Digest("07:05".into()));
        assert_eq!(Command::parse("/digest 25:00", 5), Command::Usage("/digest HH:MM"));
        assert_eq!(Command::parse("/frobnicate", 5), Command::Unknown("frobnicate".into()));
    }

    #[test]
    fn test_callback_round_trip_through_display() {
        let list = Callback::List(ListView {
            kind: ItemKind::Task,
            page: PageRequest::new(5, 2),
        });
        assert_eq!(list.to_string(), "list:task:2");
        assert_eq!(Callback::parse("list:task:2", 5), Some(list));

        assert_eq!(
            Callback::parse("done:idea:42", 5),
            Some(Callback::Done {
                kind: ItemKind::Idea,
                id: ItemId(42)
            })
        );
        assert_eq!(Callback::parse("undo:tasks:7", 5).map(|c| c.to_string()), Some("undo:task:7".into()));
    }

    #[test]
    fn test_malformed_callbacks() {
        for data in ["", "list", "list:note:1", "done:idea:abc", "wipe:idea:1", "list:idea:-1"] {
            assert_eq!(Callback::parse(data, 5), None, "{data}");
        }
    }

    #[test]
    fn test_menu_label_variants_cover_legacy_labels() {
        let labels = menu_label_variants();
        assert!(labels.contains(&"📝 My ideas"));
        assert!(labels.contains(&"My ideas"));
        assert!(labels.contains(&"📊 Статистика"));
        assert_eq!(labels.len(), MenuAction::ALL.len() * 2 + LEGACY_MENU_LABELS.len());
    }
}
