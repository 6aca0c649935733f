use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::error::{MigrationError, Result};

/// Default timestamp layout used for new migration filenames.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";

/// Turns a migration name into the filename of a new migration.
///
/// Only used when creating migrations. Applying accepts any `.sql` filename.
pub trait FilenameFormatter: Send + Sync {
    fn format(&self, name: &str) -> String;
}

/// `<UTC timestamp>_<lowercased name>.sql`.
#[derive(Debug, Clone)]
pub struct TimestampFormatter {
    format: String,
}

impl TimestampFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Like `new`, but rejects layouts chrono cannot render.
    pub fn parse(format: &str) -> Result<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(MigrationError::Config(format!(
                "invalid timestamp format {:?}",
                format
            )));
        }
        Ok(Self::new(format))
    }

    pub fn format_at(&self, name: &str, now: DateTime<Utc>) -> String {
        let mut file = format!("{}_{}", now.format(&self.format), name.to_lowercase());
        if !file.ends_with(".sql") {
            file.push_str(".sql");
        }
        file
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMAT)
    }
}

impl FilenameFormatter for TimestampFormatter {
    fn format(&self, name: &str) -> String {
        self.format_at(name, Utc::now())
    }
}

impl<F> FilenameFormatter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn format(&self, name: &str) -> String {
        self(name)
    }
}
