#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # TileCL Runtime
//!
//! Executable model of an accelerator core: the fixed-capacity arenas of the on-chip tiers,
//! the pipes and the handshakes between them, the trace of issued instructions, and the
//! configuration and logging shared by the movement engines.

extern crate alloc;

#[macro_use]
extern crate derive_new;

mod ai_core;
mod id;

/// Configuration and logging.
pub mod config;
/// On-chip tier arenas.
pub mod memory_management;
/// Pipes, handshakes and hazard detection.
pub mod sync;
/// Trace of the issued instructions.
pub mod trace;

pub use ai_core::*;
pub use id::*;

/// Assert a kernel invariant that can only be checked at run time.
///
/// A violated invariant is reported through [kernel_panic].
#[macro_export]
macro_rules! kernel_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::kernel_panic!($($arg)+);
        }
    };
}

/// Log a violated kernel invariant at the error level, then abort the kernel with a panic.
#[macro_export]
macro_rules! kernel_panic {
    ($($arg:tt)+) => {{
        let message = $crate::__private::format!($($arg)+);
        $crate::__private::log::error!("{message}");
        panic!("{message}")
    }};
}

#[doc(hidden)]
pub mod __private {
    pub use alloc::format;
    pub use log;
}
