//! Tracing setup.
//!
//! Spans and events from the scanner are only collected when
//! `REACT_COMPILER_MARKER_TRACE` is set. Its value is an `EnvFilter` directive
//! such as `debug` or `react_compiler_marker::report=trace`. Output goes to
//! stderr, as stdout carries LSP frames.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const TRACE_ENV: &str = "REACT_COMPILER_MARKER_TRACE";

/// Whether a tracing subscriber was installed (affects logger setup in main).
pub struct TelemetryGuard {
    pub tracing_enabled: bool,
}

pub fn init_telemetry() -> TelemetryGuard {
    match std::env::var(TRACE_ENV) {
        Ok(directives) if !directives.trim().is_empty() => init_with_filter(&directives),
        _ => TelemetryGuard {
            tracing_enabled: false,
        },
    }
}

fn init_with_filter(directives: &str) -> TelemetryGuard {
    let filter = match EnvFilter::try_new(directives) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Ignoring invalid {TRACE_ENV}={directives}: {e}");
            EnvFilter::new("debug")
        }
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    TelemetryGuard {
        tracing_enabled: installed,
    }
}
