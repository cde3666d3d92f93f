use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::atomic_io::write_text_atomic;

static COLLECTOR_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_collector_lock_poison_once(operation: &'static str) {
    if COLLECTOR_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "log collector lock poisoned; recovered buffer");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn from_tracing(level: &Level) -> Self {
        if *level == Level::ERROR {
            LogLevel::Error
        } else if *level == Level::WARN {
            LogLevel::Warning
        } else {
            LogLevel::Info
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            LogLevel::Info => "log",
            LogLevel::Warning => "warn",
            LogLevel::Error => "err",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("Info"),
            LogLevel::Warning => f.write_str("Warning"),
            LogLevel::Error => f.write_str("Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Append-only record buffer shared between the tracing layer and whoever
/// exports. The lock is held only while appending or copying out.
#[derive(Debug, Clone, Default)]
pub struct LogCollector {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, Vec<LogRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_collector_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }

    pub fn push(&self, record: LogRecord) {
        self.lock("push").push(record);
    }

    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.lock("snapshot").clone()
    }

    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.lock("drain"))
    }

    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layer(&self) -> CollectorLayer {
        CollectorLayer {
            collector: self.clone(),
        }
    }
}

/// Feeds every tracing event into a [`LogCollector`].
#[derive(Debug, Clone)]
pub struct CollectorLayer {
    collector: LogCollector,
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CollectorLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.collector.push(LogRecord {
            time: Local::now(),
            level: LogLevel::from_tracing(event.metadata().level()),
            message: format!("{}{}", visitor.message, visitor.fields),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExportFilter {
    pub include_info: bool,
    pub include_warnings: bool,
    pub include_errors: bool,
    pub message_prefix: Option<String>,
}

impl Default for LogExportFilter {
    fn default() -> Self {
        Self {
            include_info: true,
            include_warnings: true,
            include_errors: true,
            message_prefix: None,
        }
    }
}

impl LogExportFilter {
    pub fn accepts(&self, record: &LogRecord) -> bool {
        if let Some(prefix) = self
            .message_prefix
            .as_deref()
            .filter(|prefix| !prefix.trim().is_empty())
        {
            if !record.message.starts_with(prefix) {
                return false;
            }
        }
        match record.level {
            LogLevel::Info => self.include_info,
            LogLevel::Warning => self.include_warnings,
            LogLevel::Error => self.include_errors,
        }
    }
}

#[derive(Debug, Error)]
pub enum LogExportError {
    #[error("no log records match the export filter")]
    NothingToExport,
    #[error("failed to write log export {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes the matching records to `vragent_log_<timestamp>.html` under
/// `out_dir` and returns the file path and record count.
pub fn export_html(
    records: &[LogRecord],
    filter: &LogExportFilter,
    out_dir: &Path,
    now: DateTime<Local>,
) -> Result<(PathBuf, usize), LogExportError> {
    let selected = records
        .iter()
        .filter(|record| filter.accepts(record))
        .collect::<Vec<_>>();
    if selected.is_empty() {
        return Err(LogExportError::NothingToExport);
    }

    let path = out_dir.join(format!("vragent_log_{}.html", now.format("%Y%m%d_%H%M%S")));
    let html = render_html(&selected, now);
    write_text_atomic(&path, &html).map_err(|source| LogExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok((path, selected.len()))
}

pub fn render_html(records: &[&LogRecord], generated_at: DateTime<Local>) -> String {
    let mut html = String::new();
    html.push_str("<html><head><meta charset='utf-8'><style>\n");
    html.push_str("body { font-family: monospace; }\n");
    html.push_str(".log { color: #222; } .warn { color: #a60; } .err { color: #c00; }\n");
    html.push_str("</style></head><body>\n");
    let _ = writeln!(
        html,
        "<h2>VR agent log export ({})</h2>",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    let mut current_day = String::new();
    for record in records {
        let day = record.time.format("%Y-%m-%d").to_string();
        if day != current_day {
            if !current_day.is_empty() {
                html.push_str("</div>\n");
            }
            let _ = writeln!(html, "<div class='day'><h3>{day}</h3>");
            current_day = day;
        }
        let _ = writeln!(
            html,
            "<div class='entry {}'><b>[{}] [{}]</b> {}</div>",
            record.level.css_class(),
            record.time.format("%H:%M:%S"),
            record.level,
            escape_html(&record.message)
        );
    }
    if !current_day.is_empty() {
        html.push_str("</div>\n");
    }
    html.push_str("</body></html>\n");
    html
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '\n' => escaped.push_str("<br/>"),
            other => escaped.push(other),
        }
    }
    escaped
}
