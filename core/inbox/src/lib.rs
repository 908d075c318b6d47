pub mod assistant;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod pagination;
pub mod rate_limit;
pub mod repository;
pub mod service;
pub mod settings;
pub mod telemetry;
pub mod timezone;
pub mod validation;

pub use assistant::{Assistant, AssistantOptions, Button, Reply};
pub use classifier::{Classified, ItemClassifier};
pub use commands::{menu_label_variants, Callback, Command, ListView, MenuAction};
pub use config::{Config, ConfigError};
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use pagination::{paginate, Page, PageRequest};
pub use rate_limit::{RateLimiter, SlidingWindowLimiter};
pub use repository::{
    EntityKind, IdeaRepository, Ideas, ItemRepository, TaskRepository, Tasks, ORDINAL_WINDOW,
};
pub use settings::{SettingsDefaults, SettingsRepository};
pub use timezone::ReportingZone;
pub use validation::{ContentValidator, ValidationError};
