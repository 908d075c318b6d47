use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

use idea_inbox_schemas::OwnerId;

pub const MAX_CONTENT_CHARS: usize = 4000;

/// More than this many distinct spam words rejects a message
const SPAM_THRESHOLD: usize = 2;

const SPAM_WORDS: &[&str] = &[
    "реклама",
    "спам",
    "купить",
    "продать",
    "заработок",
    "криптовалюта",
    "биткоин",
    "инвестиции",
];

static FORBIDDEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script.*?>.*?</script>",
        r"(?i)javascript:",
        r"(?i)data:text/html",
        r"(?i)vbscript:",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid forbidden pattern"))
    .collect()
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message is empty")]
    Empty,

    #[error("message is too long ({chars} characters, at most {max})")]
    TooLong { chars: usize, max: usize },

    #[error("message contains forbidden content")]
    Forbidden,

    #[error("message looks like spam ({matches} spam words)")]
    Spam { matches: usize },

    #[error("owner id must be positive, got {0}")]
    InvalidOwner(i64),
}

/// Checks user-supplied text before it reaches storage
#[derive(Debug, Clone)]
pub struct ContentValidator {
    max_chars: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(MAX_CONTENT_CHARS)
    }
}

impl ContentValidator {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn validate(&self, content: &str) -> Result<(), ValidationError> {
        if content.trim().is_empty() {
            return Err(ValidationError::Empty);
        }

        let chars = content.chars().count();
        if chars > self.max_chars {
            return Err(ValidationError::TooLong {
                chars,
                max: self.max_chars,
            });
        }

        if let Some(pattern) = FORBIDDEN_PATTERNS.iter().find(|p| p.is_match(content)) {
            warn!("Forbidden pattern in message: {}", pattern.as_str());
            return Err(ValidationError::Forbidden);
        }

        let lower = content.to_lowercase();
        let matches = SPAM_WORDS.iter().filter(|word| lower.contains(*word)).count();
        if matches > SPAM_THRESHOLD {
            warn!("Possible spam: {} spam words", matches);
            return Err(ValidationError::Spam { matches });
        }

        Ok(())
    }

    pub fn validate_owner_id(&self, owner_id: OwnerId) -> Result<(), ValidationError> {
        if owner_id.0 <= 0 {
            return Err(ValidationError::InvalidOwner(owner_id.0));
        }
        Ok(())
    }

    /// Strip HTML tags and collapse runs of whitespace
    pub fn sanitize(&self, content: &str) -> String {
        let without_tags = HTML_TAG.replace_all(content, "");
        WHITESPACE
            .replace_all(&without_tags, " ")
            .trim()
            .to_string()
    }
}
