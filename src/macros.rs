/// Similar to `info!` macro in tracing.
/// You pass in the starting time and the event carries how long it took from starting time to now.
/// ```ignore
/// let time = Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($time:expr, $($arg:tt)+) => {{
        let run_time = (::chrono::Local::now() - $time)
            .num_microseconds()
            .map(|n| n as f64 / 1_000_000.0)
            .unwrap_or(0.0);
        ::tracing::info!(run_time_secs = run_time, $($arg)+);
    }};
}
