/// Logging setup
///
/// Everything goes through the `log` macros. At startup a fern dispatch
/// sends each record to two places:
/// - a daily file in the user data directory (full timestamps and targets)
/// - stdout (short timestamps, for running from a terminal)
///
/// Log files live in:
/// - Linux: ~/.local/share/lut-panel/logs/
/// - macOS: ~/Library/Application Support/lut-panel/logs/
/// - Windows: %APPDATA%\lut-panel\logs\

use chrono::Local;
use fern::{Dispatch, FormatCallback};
use log::{info, LevelFilter, Record};
use std::fmt::Arguments;
use std::fs;
use std::path::PathBuf;

use crate::error::LutError;

/// Initialize logging with `level` for this crate
///
/// Other crates (iced, wgpu, ...) are only logged from warn upwards.
pub fn init_logging(level: &str) -> Result<(), LutError> {
    let log_dir = get_log_directory()?;
    fs::create_dir_all(&log_dir).map_err(|e| LutError::Config(e.to_string()))?;

    let log_file_path = log_dir.join(format!("lut-panel-{}.log", Local::now().format("%Y%m%d")));
    let log_file = fern::log_file(&log_file_path).map_err(|e| LutError::Config(e.to_string()))?;

    Dispatch::new()
        .level(LevelFilter::Warn)
        .level_for("lut_panel", parse_level(level))
        .chain(Dispatch::new().format(file_line).chain(log_file))
        .chain(Dispatch::new().format(console_line).chain(std::io::stdout()))
        .apply()
        .map_err(|e| LutError::Config(e.to_string()))?;

    info!("📝 Logging to {}", log_file_path.display());
    Ok(())
}

fn file_line(out: FormatCallback, message: &Arguments, record: &Record) {
    out.finish(format_args!(
        "[{}][{}][{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.target(),
        message
    ))
}

fn console_line(out: FormatCallback, message: &Arguments, record: &Record) {
    out.finish(format_args!("[{}][{}] {}", Local::now().format("%H:%M:%S"), record.level(), message))
}

/// Get the log directory path
pub fn get_log_directory() -> Result<PathBuf, LutError> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| LutError::Config("could not determine user data directory".into()))?;

    path.push("lut-panel");
    path.push("logs");
    Ok(path)
}

/// Unknown names fall back to Info
fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}
