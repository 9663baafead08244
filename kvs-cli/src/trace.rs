use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use log::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Daily log files kept under the log directory before old ones are pruned.
const MAX_LOG_FILES: usize = 10;

/// Sets up CLI logging. Lines from this workspace (`kvs`, `kvscli`) are
/// written at the requested level to a daily-rolling file under `dir`;
/// third-party crates are capped at warnings so a `debug` run does not drown
/// in dependency chatter. With `echo` the same lines also go to stderr.
///
/// Returns the appender guard; dropping it flushes pending lines, so keep it
/// alive for the process lifetime.
pub fn init_logging(dir: &Path, level: &str, echo: bool) -> Result<WorkerGuard> {
    let level = LevelFilter::from_str(level)?;

    let file = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("kvscli")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {} - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%z"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("kvs", level)
        .level_for("kvscli", level)
        .chain(Box::new(writer) as Box<dyn Write + Send>);

    if echo {
        dispatch = dispatch.chain(std::io::stderr());
    }

    if dispatch.apply().is_err() {
        eprintln!("logger has already been set");
    }

    Ok(guard)
}
