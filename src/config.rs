//! Generator configuration.

use std::env;
use std::time::Duration;

/// Environment variable holding a deadline in milliseconds.
pub const DEADLINE_ENV: &str = "RDLC_DEADLINE_MS";
/// Environment variable overriding the definition file extension.
pub const EXTENSION_ENV: &str = "RDLC_DEFINITION_EXTENSION";

const DEFAULT_EXTENSION: &str = "rdlc";
const DEFAULT_PAGE_COUNTABLE_FORMAT: &str = "pdf";

/// Settings shared by every generation of a [`crate::ReportGenerator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    definition_extension: String,
    page_countable_format: String,
    deadline: Option<Duration>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            definition_extension: DEFAULT_EXTENSION.to_string(),
            page_countable_format: DEFAULT_PAGE_COUNTABLE_FORMAT.to_string(),
            deadline: None,
        }
    }
}

impl GeneratorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration overlaid with [`DEADLINE_ENV`] and [`EXTENSION_ENV`].
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(DEADLINE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(millis) => config.deadline = Some(Duration::from_millis(millis)),
                Err(err) => log::warn!("ignoring {DEADLINE_ENV}={raw:?}: {err}"),
            }
        }

        if let Ok(extension) = env::var(EXTENSION_ENV) {
            config.definition_extension = extension.trim().trim_start_matches('.').to_string();
        }

        config
    }

    /// Extension appended to storage keys, without the leading dot.
    pub fn definition_extension(&self) -> &str {
        &self.definition_extension
    }

    /// Output format whose pages can be counted.
    pub fn page_countable_format(&self) -> &str {
        &self.page_countable_format
    }

    /// Wall-clock budget of one generation.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Sets the definition extension and returns the updated config.
    pub fn with_definition_extension(mut self, extension: impl Into<String>) -> Self {
        self.definition_extension = extension.into();
        self
    }

    /// Sets the page-countable format and returns the updated config.
    pub fn with_page_countable_format(mut self, format: impl Into<String>) -> Self {
        self.page_countable_format = format.into();
        self
    }

    /// Sets the deadline and returns the updated config.
    pub fn with_deadline(mut self, deadline: impl Into<Option<Duration>>) -> Self {
        self.deadline = deadline.into();
        self
    }

    /// Returns `true` if pages should be counted for `format`.
    pub fn counts_pages_of(&self, format: &str) -> bool {
        format.eq_ignore_ascii_case(&self.page_countable_format)
    }
}
