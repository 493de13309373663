use parking_lot::Mutex;
/// Debug logging for termset
///
/// Controlled by the DEBUG_LEVEL environment variable:
/// - 0 or unset: No debugging
/// - 1: Errors only
/// - 2: Info level (loads, reloads, published snapshots)
/// - 3: Debug level (pipeline stages, generators)
/// - 4: Trace level (watcher events)
///
/// Output goes to termset_debug.log in the temp directory so it never mixes
/// with the command output on stdout. `log` records are routed here too once
/// [`init_log_bridge`] has run; when RUST_LOG is set they are also mirrored to
/// stderr.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        match std::env::var("DEBUG_LEVEL") {
            Ok(val) => Self::from_number(val.trim()),
            Err(_) => DebugLevel::Off,
        }
    }

    fn from_number(text: &str) -> Self {
        match text.parse::<u8>() {
            Ok(1) => DebugLevel::Error,
            Ok(2) => DebugLevel::Info,
            Ok(3) => DebugLevel::Debug,
            Ok(4) => DebugLevel::Trace,
            _ => DebugLevel::Off,
        }
    }

    fn from_level_filter(filter: log::LevelFilter) -> Self {
        match filter {
            log::LevelFilter::Off => DebugLevel::Off,
            log::LevelFilter::Error => DebugLevel::Error,
            log::LevelFilter::Warn | log::LevelFilter::Info => DebugLevel::Info,
            log::LevelFilter::Debug => DebugLevel::Debug,
            log::LevelFilter::Trace => DebugLevel::Trace,
        }
    }

    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            DebugLevel::Off => log::LevelFilter::Off,
            DebugLevel::Error => log::LevelFilter::Error,
            DebugLevel::Info => log::LevelFilter::Info,
            DebugLevel::Debug => log::LevelFilter::Debug,
            DebugLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Path of the debug log file
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("termset_debug.log")
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
}

impl DebugLogger {
    fn new(level: DebugLevel) -> Self {
        let mut logger = DebugLogger { level, file: None };
        logger.open_file();
        logger
    }

    fn open_file(&mut self) {
        if self.level == DebugLevel::Off || self.file.is_some() {
            return;
        }
        // Silently fail if the log file can't be opened; debug output must
        // never break the command itself.
        if let Ok(f) = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
        {
            self.file = Some(f);
            self.write_raw(&format!(
                "\n{}\ntermset debug session started at {} (level={:?})\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                self.level,
                "=".repeat(80)
            ));
        }
    }

    fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
        self.open_file();
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            self.write_raw(&format!(
                "[{}] [{}] [{}] {}\n",
                get_timestamp(),
                level_str,
                category,
                msg
            ));
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new(DebugLevel::from_env())))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

/// Routes `log` records into the debug log file.
struct LogBridge {
    mirror_stderr: bool,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            log::Level::Error => DebugLevel::Error,
            log::Level::Warn | log::Level::Info => DebugLevel::Info,
            log::Level::Debug => DebugLevel::Debug,
            log::Level::Trace => DebugLevel::Trace,
        };
        let message = record.args().to_string();
        log(level, record.target(), &message);
        if self.mirror_stderr {
            eprintln!("[{:<5}] {}: {}", record.level(), record.target(), message);
        }
    }

    fn flush(&self) {}
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Level named by RUST_LOG. Accepts a bare level or `target=level` pairs, in
/// which case the last level wins.
fn rust_log_level(value: &str) -> Option<log::LevelFilter> {
    value
        .split(',')
        .filter_map(|directive| directive.rsplit('=').next())
        .filter_map(|level| level.trim().parse::<log::LevelFilter>().ok())
        .last()
}

/// Install the `log` bridge.
///
/// Precedence: `level_override` (the `--log-level` flag), then RUST_LOG,
/// then DEBUG_LEVEL. Calling this twice keeps the first bridge.
pub fn init_log_bridge(level_override: Option<log::LevelFilter>) {
    let rust_log = std::env::var("RUST_LOG").ok().filter(|v| !v.trim().is_empty());
    let level = level_override
        .or_else(|| rust_log.as_deref().and_then(rust_log_level))
        .unwrap_or_else(|| DebugLevel::from_env().to_level_filter());

    get_logger().lock().set_level(DebugLevel::from_level_filter(level));

    let bridge = BRIDGE.get_or_init(|| LogBridge {
        mirror_stderr: rust_log.is_some(),
    });
    if log::set_logger(bridge).is_ok() {
        log::set_max_level(level);
    }
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}
