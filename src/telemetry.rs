//! Telemetry helpers for applications embedding `linked-charts`.
//!
//! Lifecycle transitions, throttle supersession and commit failures are
//! reported through `tracing`. Hosts either call one of the helpers below or
//! install their own subscriber.

/// Directives used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVES: &str = "warn,linked_charts=info";

/// Installs a compact subscriber honoring `RUST_LOG`, falling back to
/// [`DEFAULT_DIRECTIVES`].
///
/// Returns `false` when the `telemetry` feature is disabled or a global
/// subscriber is already installed.
#[must_use]
pub fn init_default_tracing() -> bool {
    init_tracing_with_directives(DEFAULT_DIRECTIVES)
}

/// Same as [`init_default_tracing`] with caller-supplied fallback directives.
#[must_use]
pub fn init_tracing_with_directives(fallback: &str) -> bool {
    #[cfg(feature = "telemetry")]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = fallback;
        false
    }
}
