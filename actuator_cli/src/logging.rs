//! Tracing setup: console on stderr, optional JSON-lines file.
//!
//! stdout is reserved for command output (CSV rows, JSON summaries), so the
//! console layer always writes to stderr.

use std::path::Path;

use eyre::WrapErr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn rotation(name: Option<&str>) -> Rotation {
    match name {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::NEVER,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `console_level`.
///
/// The returned guard flushes the file writer; keep it alive until exit.
pub fn init(
    json: bool,
    console_level: &str,
    logging: &actuator_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(console_level))
        .wrap_err_with(|| format!("invalid log level {console_level:?}"))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if json {
        layers.push(console.json().with_filter(console_filter).boxed());
    } else {
        layers.push(console.with_filter(console_filter).boxed());
    }

    let mut guard = None;
    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        std::fs::create_dir_all(dir).wrap_err_with(|| format!("create log dir {}", dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(rotation(logging.rotation.as_deref()))
            .filename_prefix(name.to_string_lossy().into_owned())
            .build(dir)
            .wrap_err_with(|| format!("open log file {file}"))?;
        let (writer, g) = tracing_appender::non_blocking(appender);
        let level = logging.level.as_deref().unwrap_or("info");
        let file_filter =
            EnvFilter::try_new(level).wrap_err_with(|| format!("invalid logging.level {level:?}"))?;
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter)
                .boxed(),
        );
        guard = Some(g);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}
