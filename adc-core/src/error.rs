//! Error surface shared by every converter operation.

use core::fmt;

/// Platform resource that could not be acquired while probing the converter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resource {
    Clock,
    Registers,
    Interrupt,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Clock => f.write_str("clock"),
            Resource::Registers => f.write_str("registers"),
            Resource::Interrupt => f.write_str("interrupt"),
        }
    }
}

/// Errors reported by the arbiter, the read adapter and device probing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdcError {
    /// The priority slot is taken or the client already has a request in flight.
    Busy,
    /// The conversion did not complete within the read bound.
    Timeout,
    /// Rejected argument (empty owner, zero samples, channel out of range, foreign handle).
    InvalidArgument,
    /// No free client slot is left.
    NoMemory,
    /// Probing failed to obtain a platform resource.
    ResourceUnavailable(Resource),
}

impl AdcError {
    /// Returns `true` when the caller may retry the operation later.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, AdcError::Busy | AdcError::Timeout)
    }
}

impl fmt::Display for AdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdcError::Busy => f.write_str("converter busy"),
            AdcError::Timeout => f.write_str("conversion timed out"),
            AdcError::InvalidArgument => f.write_str("invalid argument"),
            AdcError::NoMemory => f.write_str("no free client slot"),
            AdcError::ResourceUnavailable(resource) => {
                write!(f, "{resource} unavailable")
            }
        }
    }
}

impl core::error::Error for AdcError {}
