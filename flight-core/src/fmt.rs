#![macro_use]
#![allow(unused_macros)]

#[cfg(feature = "defmt")]
#[derive(defmt::Format, Debug)]
#[allow(unused)]
pub struct Debug2DefmtWrapper<T: core::fmt::Debug>(#[defmt(Debug2Format)] pub T);

#[cfg(not(feature = "defmt"))]
#[derive(Debug)]
#[allow(unused)]
pub struct Debug2DefmtWrapper<T: core::fmt::Debug>(pub T);

/// Routes a log line to `log` when it is enabled, otherwise to `defmt`.
/// With neither backend the arguments are still borrowed so callers
/// don't trip unused-variable lints.
macro_rules! log_with_level {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::$level!($s $(, $x)*);

            #[cfg(all(feature = "defmt", not(feature = "log")))]
            ::defmt::$level!($s $(, $x)*);

            #[cfg(not(any(feature = "log", feature = "defmt")))]
            {
                $(let _ = &$x;)*
            }
        }
    };
}

macro_rules! log_trace {
    ($($arg:tt)*) => {
        log_with_level!(trace, $($arg)*)
    };
}

macro_rules! log_debug {
    ($($arg:tt)*) => {
        log_with_level!(debug, $($arg)*)
    };
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        log_with_level!(info, $($arg)*)
    };
}

macro_rules! log_warn {
    ($($arg:tt)*) => {
        log_with_level!(warn, $($arg)*)
    };
}

macro_rules! log_error {
    ($($arg:tt)*) => {
        log_with_level!(error, $($arg)*)
    };
}
