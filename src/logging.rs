use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console logging on stderr, so report previews on stdout stay readable.
///
/// `RUST_LOG` overrides the default `cohesion_report=info` directive.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cohesion_report=info"));

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}
