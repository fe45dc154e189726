use std::any::Any;
use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "taskboard";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;

const DEFAULT_SPEC_DEBUG: &str = "warn,taskboard_lib=debug,taskboard=debug";
const DEFAULT_SPEC_RELEASE: &str = "warn,taskboard_lib=info,taskboard=info";

/// Log files sit next to settings.json and tasks.json.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// `TASKBOARD_LOG` wins over `RUST_LOG`; blank values are ignored.
pub fn log_spec(taskboard_log: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        DEFAULT_SPEC_DEBUG
    } else {
        DEFAULT_SPEC_RELEASE
    };
    taskboard_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

/// Text of a panic payload, for the payload types `panic!` produces.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        *text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Starts file logging for the server. The returned handle must stay alive
/// for the life of the process; dropping it flushes and stops the logger.
#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(
    data_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};

    std::fs::create_dir_all(data_dir)?;
    let spec = log_spec(
        std::env::var("TASKBOARD_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let files = FileSpec::default()
        .directory(log_directory(data_dir))
        .basename(LOG_FILE_BASENAME)
        .suffix(LOG_FILE_SUFFIX);
    let handle = Logger::try_with_str(&spec)?
        .log_to_file(files)
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(flexi_logger::with_thread)
        .rotate(
            Criterion::AgeOrSize(Age::Day, LOG_ROTATE_SIZE_BYTES),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stdout(if cfg!(debug_assertions) {
            Duplicate::Debug
        } else {
            Duplicate::Warn
        })
        .start()?;

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_default();
        log::error!(
            "panic at {location}: {}\n{}",
            panic_message(info.payload()),
            std::backtrace::Backtrace::capture()
        );
        previous_hook(info);
    }));

    log::info!("logging to {} with spec {spec}", data_dir.display());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_prefers_taskboard_log_then_rust_log() {
        assert_eq!(
            log_spec(Some("debug".into()), Some("trace".into())),
            "debug"
        );
        assert_eq!(log_spec(Some("  ".into()), Some("trace".into())), "trace");
        let default = log_spec(None, Some(String::new()));
        assert!(default.starts_with("warn,taskboard_lib="));
    }

    #[test]
    fn panic_payloads_render_as_text() {
        let literal: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(literal.as_ref()), "static message");

        let formatted: Box<dyn Any + Send> = Box::new(format!("task {} missing", 7));
        assert_eq!(panic_message(formatted.as_ref()), "task 7 missing");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn caught_panic_payload_is_readable() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}
