use super::{EventId, Pipe};
use crate::id::FlagId;
use core::fmt::Display;

/// A single-use permit returned by [set_flag](crate::AiCore::set_flag).
///
/// The permit is consumed by [wait_flag](crate::AiCore::wait_flag), after which every access
/// the source pipe had observed when the flag was set is visible to the destination pipe. A
/// permit dropped without being awaited is reported when the kernel finishes.
#[must_use = "a flag only orders the pipes once it is awaited with `wait_flag`"]
#[derive(Debug, PartialEq, Eq)]
pub struct Flag {
    pub(crate) id: FlagId,
    pub(crate) src: Pipe,
    pub(crate) dst: Pipe,
    pub(crate) event: EventId,
}

impl Flag {
    /// The pipe that set the flag.
    pub fn src(&self) -> Pipe {
        self.src
    }

    /// The pipe that has to wait on the flag.
    pub fn dst(&self) -> Pipe {
        self.dst
    }

    /// The event of the flag.
    pub fn event(&self) -> EventId {
        self.event
    }
}

impl Display for Flag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} -> {} ({})", self.src, self.dst, self.event)
    }
}
