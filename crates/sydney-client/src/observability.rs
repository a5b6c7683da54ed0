use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::model::AskRequest;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "sydney-client.logs.jsonl";

/// Where log lines are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact human-readable lines on stderr.
    Console,
    /// One JSON object per line in `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

/// Resolved logging settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, for example `info` or `sydney_client=debug`.
    pub filter: String,
    pub output: LogOutput,
}

impl LogSettings {
    /// Reads `SYDNEY_LOG_LEVEL` (falling back to `RUST_LOG`) and
    /// `SYDNEY_JSON_LOG_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let filter = non_blank("SYDNEY_LOG_LEVEL")
            .or_else(|| non_blank("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let output = match non_blank("SYDNEY_JSON_LOG_PATH") {
            Some(path) => json_file_output(Path::new(&path)),
            None => LogOutput::Console,
        };
        Self { filter, output }
    }
}

fn json_file_output(path: &Path) -> LogOutput {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    LogOutput::JsonFile { dir, file_name }
}

/// Installs the global subscriber from the environment. Later calls are no-ops.
pub fn init_observability() {
    init_with(LogSettings::from_env());
}

/// Installs the global subscriber from explicit settings. Later calls are no-ops.
///
/// An invalid filter directive falls back to `info`.
pub fn init_with(settings: LogSettings) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = match settings.output {
            LogOutput::Console => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogOutput::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_span_list(true)
                            .with_writer(tracing_appender::rolling::never(&dir, &file_name)),
                    )
                    .try_init()
            }
        };
        if installed.is_err() {
            tracing::debug!("a global subscriber was already installed");
        }
    });
}

/// Span covering one ask inside a session.
///
/// Every interpreter log line emitted while the ask runs carries the
/// session id, the ask's generation and the reply depth.
pub fn ask_span(session_id: uuid::Uuid, generation: u64, request: &AskRequest) -> tracing::Span {
    tracing::info_span!(
        "ask",
        session_id = %session_id,
        generation,
        backend = %request.kind,
        reply_deep = request.reply_deep
    )
}
