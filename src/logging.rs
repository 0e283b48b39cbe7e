use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "gemchat=info,gemchat_core=info";

/// Initialize logging.
///
/// Records go to `<data_dir>/gemchat/gemchat.log` so they stay out of the
/// conversation, or to stderr with `--debug`. `RUST_LOG` overrides the
/// default filter.
pub fn init(debug: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if debug {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    if let Some(file) = open_log_file() {
        fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
}

fn open_log_file() -> Option<File> {
    let dir = gemchat_core::config::get_data_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("gemchat.log"))
        .ok()
}
