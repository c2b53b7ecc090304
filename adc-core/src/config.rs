//! Static configuration for one converter instance.

use core::time::Duration;

use crate::registers::Revision;

/// Prescaler value programmed at probe and resume.
pub const DEFAULT_PRESCALER: u8 = 49;

/// Bound applied to a synchronous read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Consecutive read timeouts tolerated before the converter is declared wedged.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u8 = 10;

/// Converter configuration supplied to [`Device::probe`](crate::Device::probe).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AdcConfig {
    pub revision: Revision,
    pub prescaler: u8,
    pub read_timeout: Duration,
    pub max_consecutive_errors: u8,
    /// Route the touchscreen to the secondary bank and drive the scheduler
    /// through it.
    pub second_bank: bool,
}

impl AdcConfig {
    /// Default configuration for `revision`.
    #[must_use]
    pub const fn new(revision: Revision) -> Self {
        Self {
            revision,
            prescaler: DEFAULT_PRESCALER,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            second_bank: false,
        }
    }

    #[must_use]
    pub const fn with_prescaler(mut self, prescaler: u8) -> Self {
        self.prescaler = prescaler;
        self
    }

    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_consecutive_errors(mut self, limit: u8) -> Self {
        self.max_consecutive_errors = limit;
        self
    }

    #[must_use]
    pub const fn with_second_bank(mut self, enabled: bool) -> Self {
        self.second_bank = enabled;
        self
    }
}
