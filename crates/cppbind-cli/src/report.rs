//! Logging for the command line: `env_logger` output with a module prefix,
//! warning counting and duplicate-warning suppression.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::ValueEnum;
use log::{LevelFilter, Log, Metadata, Record};

/// `--debug-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DebugLevel {
    #[default]
    Sparse,
    Medium,
    Full,
}

impl DebugLevel {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            DebugLevel::Sparse => LevelFilter::Info,
            DebugLevel::Medium => LevelFilter::Debug,
            DebugLevel::Full => LevelFilter::Trace,
        }
    }
}

pub struct Reporter {
    inner: env_logger::Logger,
    prefix: String,
    suppress_warnings: bool,
    seen_warnings: Mutex<HashSet<String>>,
    warnings: AtomicUsize,
}

impl Reporter {
    pub fn new(level: LevelFilter, module: Option<&str>, suppress_warnings: bool) -> Self {
        let env = env_logger::Env::default().default_filter_or(level.as_str());
        let inner = env_logger::Builder::from_env(env).format_timestamp(None).build();
        Self {
            inner,
            prefix: module.map(|m| format!("({m}) ")).unwrap_or_default(),
            suppress_warnings,
            seen_warnings: Mutex::new(HashSet::new()),
            warnings: AtomicUsize::new(0),
        }
    }

    /// Install as the global logger.
    pub fn install(self) -> Result<&'static Reporter, log::SetLoggerError> {
        let max_level = self.inner.filter();
        let reporter: &'static Reporter = Box::leak(Box::new(self));
        log::set_logger(reporter)?;
        log::set_max_level(max_level);
        Ok(reporter)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> String {
        match self.warning_count() {
            0 => "Done".to_string(),
            1 => "Done, 1 warning".to_string(),
            n => format!("Done, {n} warnings"),
        }
    }

    /// Count a warning; `false` when it repeats an earlier one and is suppressed.
    fn record_warning(&self, message: String) -> bool {
        if self.suppress_warnings {
            let mut seen = match self.seen_warnings.lock() {
                Ok(seen) => seen,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !seen.insert(message) {
                return false;
            }
        }
        self.warnings.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl Log for Reporter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.inner.matches(record) {
            return;
        }
        if record.level() == log::Level::Warn && !self.record_warning(record.args().to_string()) {
            return;
        }
        self.inner.log(
            &Record::builder()
                .args(format_args!("{}{}", self.prefix, record.args()))
                .level(record.level())
                .target(record.target())
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build(),
        );
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_levels() {
        assert_eq!(DebugLevel::Sparse.level_filter(), LevelFilter::Info);
        assert_eq!(DebugLevel::Full.level_filter(), LevelFilter::Trace);
    }

    #[test]
    fn test_warning_suppression() {
        let reporter = Reporter::new(LevelFilter::Off, Some("geo"), true);
        assert!(reporter.record_warning("skipped Foo".to_string()));
        assert!(!reporter.record_warning("skipped Foo".to_string()));
        assert!(reporter.record_warning("skipped Bar".to_string()));
        assert_eq!(reporter.summary(), "Done, 2 warnings");

        let verbose = Reporter::new(LevelFilter::Off, None, false);
        assert!(verbose.record_warning("x".to_string()));
        assert!(verbose.record_warning("x".to_string()));
        assert_eq!(verbose.summary(), "Done, 2 warnings");
        assert_eq!(Reporter::new(LevelFilter::Off, None, true).summary(), "Done");
    }
}
