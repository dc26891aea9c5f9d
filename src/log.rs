//! Internal logging facilities, not to be confused with _reporting_, which is
//! the model-level concept for recording data about a running simulation.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`,
//! `info!`, `debug!` and `trace!` where `error!` represents the
//! highest-priority log messages and `trace!` the lowest. To emit a log
//! message, simply use one of these macros in your code.
//!
//! Logging is _disabled_ by default. Messages are enabled/disabled using:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with
//!    priority at least `level`
//!
//! Per-module filtering of messages can be configured using
//! `set_module_filter()` and `remove_module_filter()`.

pub use log::{debug, error, info, trace, warn, LevelFilter};

use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

// Use an ISO 8601 timestamp format and color coded level tag
const DEFAULT_LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

// Logging disabled by default
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// Holds the logging configuration so that it can be mutated and reapplied
/// after the global logger has been installed. `log4rs` configurations are
/// immutable once built, so we rebuild and swap via the root `Handle`.
struct LogConfiguration {
    /// The "default" level filter for modules without an explicit filter. A
    /// global filter level of `LevelFilter::Off` disables logging.
    global_log_level: LevelFilter,
    /// Module ("target") specific level filters
    module_levels: HashMap<String, LevelFilter>,
    /// Present once the global logger has been installed
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        LogConfiguration {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_levels: HashMap::new(),
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn build(&self) -> Config {
        let encoder = Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN));
        let stdout = ConsoleAppender::builder().encoder(encoder).build();
        let mut config =
            Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));

        for (module, level) in &self.module_levels {
            config = config.logger(Logger::builder().build(module.clone(), *level));
        }

        // The `Root` determines the global log level
        let root = Root::builder()
            .appender("stdout")
            .build(self.global_log_level);
        config
            .build(root)
            .expect("failed to build logging configuration")
    }

    fn set_config(&mut self) {
        let new_config = self.build();
        match self.root_handle {
            Some(ref mut handle) => {
                // The global logger has already been initialized
                handle.set_config(new_config);
            }
            None => match log4rs::init_config(new_config) {
                Ok(handle) => {
                    self.root_handle = Some(handle);
                }
                Err(e) => {
                    // Another logger was installed first; nothing we can do.
                    eprintln!("failed to install global logger: {e}");
                }
            },
        }
    }
}

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> =
    LazyLock::new(|| Mutex::new(LogConfiguration::default()));

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION
        .lock()
        .expect("logging configuration mutex poisoned")
}

/// Enables the logger with no global level filter / full logging. Equivalent
/// to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to
/// `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off`
/// disables logging.
pub fn set_log_level(level: LevelFilter) {
    let mut configuration = get_log_configuration();
    configuration.global_log_level = level;
    configuration.set_config();
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    let mut configuration = get_log_configuration();
    configuration
        .module_levels
        .insert(module_path.to_string(), level_filter);
    configuration.set_config();
}

/// Removes a module-specific level filter for the given module path. The
/// global level filter will apply to the module.
pub fn remove_module_filter(module_path: &str) {
    let mut configuration = get_log_configuration();
    configuration.module_levels.remove(module_path);
    configuration.set_config();
}
