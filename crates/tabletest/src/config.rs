//! Harness configuration loaded from environment variables.
//!
//! | Variable              | Default  | Description                                 |
//! |-----------------------|----------|---------------------------------------------|
//! | `TABLETEST_ENGINE`    | `sqlite` | Catalog/engine strategy                     |
//! | `TABLETEST_MARKER`    | `:`      | Character that starts a placeholder token   |
//! | `TABLETEST_SEED`      | unset    | Seed for generated values (random if unset) |
//! | `TABLETEST_LOG_LEVEL` | `info`   | tracing filter (trace/debug/info/warn/error) |

use serde::{Deserialize, Serialize};
use tabletest_schema::Engine;

/// Runtime configuration for a [`Harness`](crate::Harness).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTestConfig {
    /// Which engine's catalog to introspect.
    pub engine: Engine,

    /// Cells starting with this character are placeholders.
    pub marker: char,

    /// Seed for [`RandomSynthesizer`](crate::RandomSynthesizer). `None` seeds
    /// from entropy.
    pub seed: Option<u64>,

    /// Tracing filter string, e.g. `"tabletest=debug,info"`.
    pub log_level: String,
}

impl Default for TableTestConfig {
    fn default() -> Self {
        Self {
            engine:    Engine::Sqlite,
            marker:    ':',
            seed:      None,
            log_level: "info".to_string(),
        }
    }
}

impl TableTestConfig {
    /// Load from environment variables, falling back to defaults where a
    /// variable is absent or unparseable.
    pub fn from_env() -> Self {
        let def = Self::default();
        Self {
            engine:    env_parse("TABLETEST_ENGINE", def.engine),
            marker:    env_parse("TABLETEST_MARKER", def.marker),
            seed:      std::env::var("TABLETEST_SEED").ok().and_then(|s| s.parse().ok()),
            log_level: std::env::var("TABLETEST_LOG_LEVEL").unwrap_or(def.log_level),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_marker(mut self, marker: char) -> Self {
        self.marker = marker;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
