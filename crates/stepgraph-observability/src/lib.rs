// Copyright 2025 DataStax Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! Logging setup shared by stepgraph binaries and tests.
//!
//! The stepgraph crates log through the `log` facade. The subscriber
//! installed here forwards those records to a `tracing` formatter.

use error_stack::Report;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ObservabilityError {
    #[error("Logging is already initialized")]
    AlreadyInitialized,
}

pub type Result<T> = std::result::Result<T, Report<ObservabilityError>>;

/// Log level for the logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LogConfig {
    /// Level for the stepgraph crates.
    pub log_level: LogLevel,
    /// Level for everything else.
    pub other_log_level: LogLevel,
    pub log_format: LogFormat,
}

impl LogConfig {
    /// Filter directives used when `RUST_LOG` is not set.
    pub fn filter_directives(&self) -> String {
        format!("stepgraph={},{}", self.log_level, self.other_log_level)
    }
}

/// Install the global log subscriber.
///
/// `RUST_LOG` takes precedence over the configured levels.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|_| ObservabilityError::AlreadyInitialized)?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|_| ObservabilityError::AlreadyInitialized)?,
    }

    Ok(())
}

static INIT_TEST_LOGGING: std::sync::Once = std::sync::Once::new();

/// Makes sure logging is initialized for test.
///
/// This needs to be called on each test.
pub fn init_test_logging() {
    INIT_TEST_LOGGING.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer().with_test_writer();

        // Another subscriber may already be installed by the test binary.
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("stepgraph=trace,info"))
            .with(fmt_layer)
            .try_init();
    });
}
