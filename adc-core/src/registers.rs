//! Register map for the shared converter and the hardware access seam.
//!
//! Offsets and control-register fields are common to every revision; the
//! revision only decides which optional registers exist, the sample width,
//! and how the channel multiplexer is routed. [`RegisterBlock`] abstracts the
//! accesses so the scheduler can drive real MMIO through [`MmioRegisters`] or
//! the in-memory [`RegisterFile`] used by host tooling and tests.

use core::ptr;

/// Control register fields.
#[allow(clippy::cast_lossless)]
pub mod con {
    /// Starts a conversion; self-clearing once the conversion begins.
    pub const ENABLE_START: u32 = 1 << 0;
    /// Start bit plus the start-by-read mode bit.
    pub const START_MASK: u32 = 0x3;
    /// Standby (low power) mode.
    pub const STANDBY: u32 = 1 << 2;
    pub const MUX_SHIFT: u32 = 3;
    pub const MUX_MASK: u32 = 0x7 << MUX_SHIFT;
    pub const PRESCALER_SHIFT: u32 = 6;
    pub const PRESCALER_MASK: u32 = 0xFF << PRESCALER_SHIFT;
    pub const PRESCALER_ENABLE: u32 = 1 << 14;
    /// 12-bit resolution select (revisions 2-4).
    pub const RESOLUTION_SELECT: u32 = 1 << 16;
    /// Routes the touchscreen to the secondary converter bank.
    pub const TOUCH_BANK_SELECT: u32 = 1 << 17;

    /// Encodes a prescaler value into its control-register field.
    #[must_use]
    pub const fn prescaler(value: u8) -> u32 {
        (value as u32) << PRESCALER_SHIFT
    }

    /// Encodes a channel into the control-register multiplexer field.
    #[must_use]
    pub const fn select_mux(channel: u8) -> u32 {
        ((channel as u32) << MUX_SHIFT) & MUX_MASK
    }
}

/// Channel field of the dedicated multiplexer register (revisions 3 and 4).
pub const MUX_CHANNEL_MASK: u32 = 0xF;

/// Distance between the primary and secondary converter banks.
pub const SECONDARY_BANK_OFFSET: usize = 0x1000;

/// Number of 32-bit registers in one bank.
pub const REGISTER_COUNT: usize = 8;

/// Converter registers addressed by the scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Register {
    Control,
    TouchControl,
    Delay,
    Data0,
    Data1,
    UpDown,
    ClearInterrupt,
    Mux,
}

impl Register {
    /// Byte offset from the bank base.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Register::Control => 0x00,
            Register::TouchControl => 0x04,
            Register::Delay => 0x08,
            Register::Data0 => 0x0C,
            Register::Data1 => 0x10,
            Register::UpDown => 0x14,
            Register::ClearInterrupt => 0x18,
            Register::Mux => 0x1C,
        }
    }

    /// Word index within the bank.
    #[must_use]
    pub const fn index(self) -> usize {
        self.offset() / 4
    }
}

/// Converter bank addressed by register accesses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Bank {
    #[default]
    Primary,
    Secondary,
}

impl Bank {
    const fn base_offset(self) -> usize {
        match self {
            Bank::Primary => 0,
            Bank::Secondary => SECONDARY_BANK_OFFSET,
        }
    }

    const fn index(self) -> usize {
        match self {
            Bank::Primary => 0,
            Bank::Secondary => 1,
        }
    }
}

/// Converter hardware revision.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Revision {
    /// S3C24XX.
    V1,
    /// S3C64XX, S5P64X0, S5PC100.
    V2,
    /// S5PV210, S5PC110, EXYNOS4210.
    V3,
    /// EXYNOS4412, EXYNOS5250.
    V4,
}

impl Revision {
    /// Resolves a platform device id to its revision.
    #[must_use]
    pub fn from_device_id(name: &str) -> Option<Self> {
        match name {
            "s3c24xx-adc" => Some(Revision::V1),
            "s3c64xx-adc" => Some(Revision::V2),
            "samsung-adc-v3" => Some(Revision::V3),
            "samsung-adc-v4" => Some(Revision::V4),
            _ => None,
        }
    }

    /// Returns the platform device id for this revision.
    #[must_use]
    pub const fn device_id(self) -> &'static str {
        match self {
            Revision::V1 => "s3c24xx-adc",
            Revision::V2 => "s3c64xx-adc",
            Revision::V3 => "samsung-adc-v3",
            Revision::V4 => "samsung-adc-v4",
        }
    }

    /// Mask applied to raw data register values.
    #[must_use]
    pub const fn resolution_mask(self) -> u16 {
        match self {
            Revision::V1 => 0x3FF,
            _ => 0xFFF,
        }
    }

    #[must_use]
    pub const fn has_resolution_select(self) -> bool {
        !matches!(self, Revision::V1)
    }

    /// Only the newest revision drops the second data register.
    #[must_use]
    pub const fn has_second_data(self) -> bool {
        !matches!(self, Revision::V4)
    }

    /// The oldest revision acknowledges interrupts implicitly.
    #[must_use]
    pub const fn has_interrupt_clear(self) -> bool {
        !matches!(self, Revision::V1)
    }

    /// Revisions 3 and 4 route channels through the dedicated mux register.
    #[must_use]
    pub const fn has_mux_register(self) -> bool {
        matches!(self, Revision::V3 | Revision::V4)
    }

    /// Number of selectable input channels.
    #[must_use]
    pub const fn channel_count(self) -> u8 {
        if self.has_mux_register() { 10 } else { 8 }
    }
}

/// Register access used by the scheduler.
pub trait RegisterBlock {
    fn read(&mut self, reg: Register) -> u32;

    fn write(&mut self, reg: Register, value: u32);

    /// Read-modify-write helper.
    fn modify(&mut self, reg: Register, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Switches subsequent accesses to another converter bank.
    fn select_bank(&mut self, bank: Bank) {
        let _ = bank;
    }
}

/// Volatile register accesses against a mapped converter.
pub struct MmioRegisters {
    base: *mut u8,
    bank: Bank,
}

impl MmioRegisters {
    /// Wraps a mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must point at the converter's primary bank, mapped for reads and
    /// writes across both banks, and must stay valid for the lifetime of the
    /// returned value. No other code may access the window concurrently.
    #[must_use]
    pub const unsafe fn new(base: *mut u8) -> Self {
        Self {
            base,
            bank: Bank::Primary,
        }
    }

    #[allow(clippy::cast_ptr_alignment)]
    fn address(&self, reg: Register) -> *mut u32 {
        self.base
            .wrapping_add(self.bank.base_offset() + reg.offset())
            .cast::<u32>()
    }
}

// SAFETY: the window is exclusively owned by this value (see `new`), and the
// device serialises every access behind its critical section.
unsafe impl Send for MmioRegisters {}

impl RegisterBlock for MmioRegisters {
    fn read(&mut self, reg: Register) -> u32 {
        // SAFETY: `new` guarantees the window covers every register offset.
        unsafe { ptr::read_volatile(self.address(reg)) }
    }

    fn write(&mut self, reg: Register, value: u32) {
        // SAFETY: `new` guarantees the window covers every register offset.
        unsafe { ptr::write_volatile(self.address(reg), value) }
    }

    fn select_bank(&mut self, bank: Bank) {
        self.bank = bank;
    }
}

/// In-memory register bank with just enough behaviour to stand in for the
/// converter: start requests are counted and self-clear, interrupt clears are
/// counted, and data registers return whatever was last loaded.
#[derive(Clone, Debug, Default)]
pub struct RegisterFile {
    banks: [[u32; REGISTER_COUNT]; 2],
    bank: Bank,
    triggers: u32,
    interrupt_clears: u32,
}

impl RegisterFile {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            banks: [[0; REGISTER_COUNT]; 2],
            bank: Bank::Primary,
            triggers: 0,
            interrupt_clears: 0,
        }
    }

    /// Number of conversions started so far.
    #[must_use]
    pub const fn triggers(&self) -> u32 {
        self.triggers
    }

    /// Number of interrupt-clear writes seen so far.
    #[must_use]
    pub const fn interrupt_clears(&self) -> u32 {
        self.interrupt_clears
    }

    /// Bank currently addressed by accesses.
    #[must_use]
    pub const fn bank(&self) -> Bank {
        self.bank
    }

    /// Reads a register of the active bank without side effects.
    #[must_use]
    pub const fn peek(&self, reg: Register) -> u32 {
        self.banks[self.bank.index()][reg.index()]
    }

    /// Reads a register of an explicit bank without side effects.
    #[must_use]
    pub const fn peek_bank(&self, bank: Bank, reg: Register) -> u32 {
        self.banks[bank.index()][reg.index()]
    }

    /// Loads the raw values the next conversion will report.
    pub fn load_sample(&mut self, data0: u32, data1: u32) {
        let bank = &mut self.banks[self.bank.index()];
        bank[Register::Data0.index()] = data0;
        bank[Register::Data1.index()] = data1;
    }

    /// Channel currently routed to the converter for `revision`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn selected_channel(&self, revision: Revision) -> u8 {
        let raw = if revision.has_mux_register() {
            self.peek(Register::Mux) & MUX_CHANNEL_MASK
        } else {
            (self.peek(Register::Control) & con::MUX_MASK) >> con::MUX_SHIFT
        };
        // Both fields are at most four bits wide.
        raw as u8
    }
}

impl RegisterBlock for RegisterFile {
    fn read(&mut self, reg: Register) -> u32 {
        self.peek(reg)
    }

    fn write(&mut self, reg: Register, value: u32) {
        let value = match reg {
            Register::Control if value & con::ENABLE_START != 0 => {
                self.triggers = self.triggers.wrapping_add(1);
                value & !con::ENABLE_START
            }
            Register::ClearInterrupt => {
                self.interrupt_clears = self.interrupt_clears.wrapping_add(1);
                value
            }
            _ => value,
        };
        self.banks[self.bank.index()][reg.index()] = value;
    }

    fn select_bank(&mut self, bank: Bank) {
        self.bank = bank;
    }
}
