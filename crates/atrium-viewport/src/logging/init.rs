use std::sync::Once;

/// Logger configuration.
///
/// `filter` follows the `env_logger` syntax (e.g. "info",
/// "atrium_viewport=debug,wgpu=warn"). When `None`, `RUST_LOG` is consulted
/// before falling back to warn-level output.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Subsequent calls are ignored, so both the host application and the demo
/// binary can call this unconditionally.
pub fn init_logging(config: LogConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            // wgpu is chatty at info level; default to warnings.
            builder.filter_level(log::LevelFilter::Warn);
            builder.filter_module("atrium_viewport", log::LevelFilter::Info);
        }

        builder.init();

        log::debug!("logging initialized");
    });
}
