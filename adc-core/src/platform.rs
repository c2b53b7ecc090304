//! Platform resources the converter needs besides its registers.

use crate::error::{AdcError, Resource};
use crate::registers::{RegisterBlock, RegisterFile};

/// Clock, register window and interrupt line of one converter.
pub trait Platform {
    type Registers: RegisterBlock;

    /// Obtains the converter clock.
    ///
    /// # Errors
    ///
    /// Returns [`AdcError::ResourceUnavailable`] when the clock is missing.
    fn acquire_clock(&mut self) -> Result<(), AdcError>;

    /// Maps the register window.
    ///
    /// # Errors
    ///
    /// Returns [`AdcError::ResourceUnavailable`] when the window cannot be mapped.
    fn map_registers(&mut self) -> Result<Self::Registers, AdcError>;

    /// Attaches the conversion handler to the interrupt line.
    ///
    /// # Errors
    ///
    /// Returns [`AdcError::ResourceUnavailable`] when the line cannot be claimed.
    fn request_irq(&mut self) -> Result<(), AdcError>;

    fn set_clock_enabled(&mut self, enabled: bool);

    fn set_irq_enabled(&mut self, enabled: bool);

    fn free_irq(&mut self);

    fn release_clock(&mut self);
}

impl<T: Platform + ?Sized> Platform for &mut T {
    type Registers = T::Registers;

    fn acquire_clock(&mut self) -> Result<(), AdcError> {
        (**self).acquire_clock()
    }

    fn map_registers(&mut self) -> Result<Self::Registers, AdcError> {
        (**self).map_registers()
    }

    fn request_irq(&mut self) -> Result<(), AdcError> {
        (**self).request_irq()
    }

    fn set_clock_enabled(&mut self, enabled: bool) {
        (**self).set_clock_enabled(enabled);
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        (**self).set_irq_enabled(enabled);
    }

    fn free_irq(&mut self) {
        (**self).free_irq();
    }

    fn release_clock(&mut self) {
        (**self).release_clock();
    }
}

/// In-memory platform backed by a [`RegisterFile`].
///
/// Tracks clock and interrupt state so host tooling can observe power
/// transitions, and can be told to fail one acquisition step.
#[derive(Debug)]
pub struct HostPlatform {
    registers: Option<RegisterFile>,
    failing: Option<Resource>,
    clock_held: bool,
    clock_enabled: bool,
    irq_requested: bool,
    irq_enabled: bool,
}

impl HostPlatform {
    /// Creates a platform whose every resource is available.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registers: Some(RegisterFile::new()),
            failing: None,
            clock_held: false,
            clock_enabled: false,
            irq_requested: false,
            irq_enabled: false,
        }
    }

    /// Creates a platform that refuses to hand out `resource`.
    #[must_use]
    pub const fn failing(resource: Resource) -> Self {
        let mut platform = Self::new();
        platform.failing = Some(resource);
        platform
    }

    #[must_use]
    pub const fn clock_held(&self) -> bool {
        self.clock_held
    }

    #[must_use]
    pub const fn clock_enabled(&self) -> bool {
        self.clock_enabled
    }

    #[must_use]
    pub const fn irq_requested(&self) -> bool {
        self.irq_requested
    }

    #[must_use]
    pub const fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    fn check(&self, resource: Resource) -> Result<(), AdcError> {
        if self.failing == Some(resource) {
            Err(AdcError::ResourceUnavailable(resource))
        } else {
            Ok(())
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HostPlatform {
    type Registers = RegisterFile;

    fn acquire_clock(&mut self) -> Result<(), AdcError> {
        self.check(Resource::Clock)?;
        self.clock_held = true;
        Ok(())
    }

    fn map_registers(&mut self) -> Result<RegisterFile, AdcError> {
        self.check(Resource::Registers)?;
        self.registers
            .take()
            .ok_or(AdcError::ResourceUnavailable(Resource::Registers))
    }

    fn request_irq(&mut self) -> Result<(), AdcError> {
        self.check(Resource::Interrupt)?;
        self.irq_requested = true;
        self.irq_enabled = true;
        Ok(())
    }

    fn set_clock_enabled(&mut self, enabled: bool) {
        self.clock_enabled = enabled;
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }

    fn free_irq(&mut self) {
        self.irq_requested = false;
        self.irq_enabled = false;
    }

    fn release_clock(&mut self) {
        self.clock_held = false;
    }
}
