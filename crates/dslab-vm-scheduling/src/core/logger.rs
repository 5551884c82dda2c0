//! Logging macros bound to simulation context.
//!
//! Every record looks like `[<time> <LEVEL> <component>] <message>`, where time and component are taken from the
//! context passed as the first macro argument. The context is usually a
//! [`SimulationContext`](crate::core::context::SimulationContext), but anything with `time() -> f64` and
//! `name() -> &str` methods works. The component name is also used as the log target, so `RUST_LOG` can filter
//! records of a single scheduler:
//!
//! ```text
//! RUST_LOG=BFD=debug,simulation=info
//! ```

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::Level;

/// Level name padded to fixed width, colored only when stderr is a terminal.
pub fn level_label(level: Level) -> ColoredString {
    let label = format!("{:<5}", level.to_string());
    if !atty::is(Stream::Stderr) {
        return label.normal();
    }
    let color = match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Cyan,
    };
    label.color(color)
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($level:ident, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::log::log!(
            target: ctx.name(),
            $crate::log::Level::$level,
            "[{:.3} {} {}] {}",
            ctx.time(),
            $crate::core::logger::level_label($crate::log::Level::$level),
            ctx.name(),
            format_args!($($arg)+)
        )
    }};
}

/// Logs a message at the info level: `log_info!(ctx, "placed {} vms", count)`.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => ($crate::log_at!(Info, $ctx, "{}", $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::log_at!(Info, $ctx, $format, $($arg)+));
}

#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => ($crate::log_at!(Debug, $ctx, "{}", $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::log_at!(Debug, $ctx, $format, $($arg)+));
}

#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $msg:expr) => ($crate::log_at!(Trace, $ctx, "{}", $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::log_at!(Trace, $ctx, $format, $($arg)+));
}

#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $msg:expr) => ($crate::log_at!(Warn, $ctx, "{}", $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::log_at!(Warn, $ctx, $format, $($arg)+));
}

#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $msg:expr) => ($crate::log_at!(Error, $ctx, "{}", $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::log_at!(Error, $ctx, $format, $($arg)+));
}
