use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use idea_inbox_schemas::ItemKind;

static EXPLICIT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(idea|task|идея|задача)\s*:\s*").expect("valid prefix pattern")
});

/// Free text classified into a partition, with any explicit prefix removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ItemKind,
    pub content: String,
}

/// Heuristic idea/task split. Anything that does not look like a to-do is an idea.
pub struct ItemClassifier {
    task_patterns: Vec<Regex>,
}

impl Default for ItemClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemClassifier {
    pub fn new() -> Self {
        let patterns = [
            // Explicit markers
            r"(?i)\b(todo|to-do|fixme|action item)\b",
            r"(?i)\b(need to|have to|must|remember to|don't forget to|remind me)\b",
            r"(?i)^\s*(buy|call|send|pay|book|fix|finish|schedule)\b",
            // Russian
            r"(?i)(^|\s)(надо|нужно|необходимо|не забыть|напомни(ть)?)(\s|$)",
            r"(?i)(^|\s)(купить|позвонить|написать|отправить|оплатить|сделать|записаться)(\s|$)",
        ];

        Self {
            task_patterns: patterns
                .iter()
                .map(|pattern| Regex::new(pattern).expect("valid task pattern"))
                .collect(),
        }
    }

    pub fn classify(&self, text: &str) -> Classified {
        if let Some(caps) = EXPLICIT_PREFIX.captures(text) {
            let kind = match caps[1].to_lowercase().as_str() {
                "task" | "задача" => ItemKind::Task,
                _ => ItemKind::Idea,
            };
            let content = text[caps.get(0).map_or(0, |m| m.end())..].trim().to_string();
            return Classified { kind, content };
        }

        let kind = if self.task_patterns.iter().any(|p| p.is_match(text)) {
            ItemKind::Task
        } else {
            ItemKind::Idea
        };
        debug!("Classified message as {}", kind);

        Classified {
            kind,
            content: text.trim().to_string(),
        }
    }
}
