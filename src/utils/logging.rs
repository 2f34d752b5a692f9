//! Logging initialization for the sketchbrew server

use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Map `-v`/`-q` flags to a level filter
pub fn level_from_flags(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Initialize logging for the server
///
/// `structured` selects one JSON object per line, written to `log_file` when
/// given and stdout otherwise. `RUST_LOG` still applies on top of `level`.
pub fn init_server_logging(
    structured: bool,
    log_file: Option<&str>,
    level: Option<LevelFilter>,
) -> Result<()> {
    let level = level.unwrap_or(LevelFilter::Info);

    if structured {
        init_json_logger(level, log_file)?;
    } else {
        init_human_readable_server_logger(level)?;
    }

    // Panics inside spawned tasks otherwise only reach stderr
    log_panics::init();

    log::info!("sketchbrew server logging initialized with level: {:?}", level);
    Ok(())
}

/// Initialize JSON structured logging for server
fn init_json_logger(level: LevelFilter, log_file: Option<&str>) -> Result<()> {
    use std::fs::OpenOptions;

    let target: Box<dyn Write + Send> = if let Some(file_path) = log_file {
        Box::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?,
        )
    } else {
        Box::new(std::io::stdout())
    };

    Builder::from_default_env()
        .target(Target::Pipe(target))
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "{}", json_record(record)))
        .try_init()?;

    Ok(())
}

/// Initialize human-readable logging for server
fn init_human_readable_server_logger(level: LevelFilter) -> Result<()> {
    Builder::from_default_env()
        .target(Target::Stdout)
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                buf.timestamp(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .try_init()?;

    Ok(())
}

fn json_record(record: &log::Record<'_>) -> serde_json::Value {
    serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "level": record.level().to_string(),
        "module": record.module_path().unwrap_or("unknown"),
        "message": record.args().to_string(),
        "target": record.target(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_selection() {
        assert_eq!(level_from_flags(0, true), LevelFilter::Error);
        assert_eq!(level_from_flags(3, true), LevelFilter::Error);
        assert_eq!(level_from_flags(0, false), LevelFilter::Info);
        assert_eq!(level_from_flags(1, false), LevelFilter::Debug);
        assert_eq!(level_from_flags(2, false), LevelFilter::Trace);
    }

    #[test]
    fn test_json_record_fields() {
        let value = json_record(
            &log::Record::builder()
                .args(format_args!("port opened"))
                .level(log::Level::Warn)
                .target("sketchbrew::serial")
                .module_path(Some("sketchbrew::serial::registry"))
                .build(),
        );

        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "port opened");
        assert_eq!(value["module"], "sketchbrew::serial::registry");
        assert_eq!(value["target"], "sketchbrew::serial");
        assert!(value["timestamp"].as_str().is_some());
    }
}
