//! Quiet-mode aware logging. Worker processes run with CROMPER_QUIET=1 so
//! per-job chatter stays out of the service log.

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            tracing::info!($($arg)*);
        }
    }};
}

pub fn is_quiet() -> bool {
    cromper_core::config::ObservabilityConfig::from_env().quiet
}
