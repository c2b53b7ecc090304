//! Built-in consumers of the converter.
//!
//! The touchscreen takes the priority role and samples both axes over a burst;
//! the hardware monitor is an ordinary client reading one channel at a time.

use crate::client::{ClientRole, ConversionClient};
use crate::registers::Revision;

/// Samples averaged into one touch point unless configured otherwise.
pub const DEFAULT_TOUCH_SAMPLES: u32 = 4;

/// Averaged touchscreen position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
}

/// Accumulates an X/Y burst and latches the averaged point when it ends.
#[derive(Debug)]
pub struct Touchscreen {
    samples_per_point: u32,
    sum_x: u64,
    sum_y: u64,
    count: u64,
    converting: bool,
    point: Option<TouchPoint>,
}

impl Touchscreen {
    #[must_use]
    pub const fn new(samples_per_point: u32) -> Self {
        Self {
            samples_per_point,
            sum_x: 0,
            sum_y: 0,
            count: 0,
            converting: false,
            point: None,
        }
    }

    /// Sample count to request per touch point.
    #[must_use]
    pub const fn samples_per_point(&self) -> u32 {
        self.samples_per_point
    }

    /// Whether the converter is currently routed to the touch panel.
    #[must_use]
    pub const fn is_converting(&self) -> bool {
        self.converting
    }

    /// Takes the last completed point.
    pub fn take_point(&mut self) -> Option<TouchPoint> {
        self.point.take()
    }

    fn latch(&mut self) {
        if self.count == 0 {
            return;
        }
        let x = self.sum_x / self.count;
        let y = self.sum_y / self.count;
        self.point = Some(TouchPoint {
            x: u16::try_from(x).unwrap_or(u16::MAX),
            y: u16::try_from(y).unwrap_or(u16::MAX),
        });
        self.sum_x = 0;
        self.sum_y = 0;
        self.count = 0;
    }
}

impl Default for Touchscreen {
    fn default() -> Self {
        Self::new(DEFAULT_TOUCH_SAMPLES)
    }
}

impl ConversionClient for Touchscreen {
    fn on_select(&mut self, activating: bool) {
        self.converting = activating;
    }

    fn on_sample(&mut self, data0: u16, data1: u16, remaining: &mut u32) {
        self.sum_x = self.sum_x.saturating_add(u64::from(data0));
        self.sum_y = self.sum_y.saturating_add(u64::from(data1));
        self.count = self.count.saturating_add(1);
        if *remaining == 0 {
            self.latch();
        }
    }
}

/// Keeps the latest reading of an ordinary monitoring channel.
#[derive(Debug, Default)]
pub struct Hwmon {
    latest: Option<u16>,
    readings: u32,
}

impl Hwmon {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: None,
            readings: 0,
        }
    }

    #[must_use]
    pub const fn latest(&self) -> Option<u16> {
        self.latest
    }

    #[must_use]
    pub const fn readings(&self) -> u32 {
        self.readings
    }

    /// Scales a raw sample to millivolts against `reference_mv`.
    #[must_use]
    pub fn millivolts(raw: u16, reference_mv: u32, revision: Revision) -> u32 {
        let full_scale = u32::from(revision.resolution_mask());
        u32::from(raw) * reference_mv / full_scale
    }
}

impl ConversionClient for Hwmon {
    fn on_sample(&mut self, data0: u16, _data1: u16, _remaining: &mut u32) {
        self.latest = Some(data0);
        self.readings = self.readings.wrapping_add(1);
    }
}

/// The consumers a device can host side by side.
#[derive(Debug)]
pub enum Consumer {
    Touchscreen(Touchscreen),
    Hwmon(Hwmon),
}

impl Consumer {
    /// Role the consumer registers with.
    #[must_use]
    pub const fn role(&self) -> ClientRole {
        match self {
            Consumer::Touchscreen(_) => ClientRole::Priority,
            Consumer::Hwmon(_) => ClientRole::Ordinary,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Consumer::Touchscreen(_) => "ts",
            Consumer::Hwmon(_) => "hwmon",
        }
    }

    pub fn as_touchscreen_mut(&mut self) -> Option<&mut Touchscreen> {
        match self {
            Consumer::Touchscreen(ts) => Some(ts),
            Consumer::Hwmon(_) => None,
        }
    }
}

impl From<Touchscreen> for Consumer {
    fn from(ts: Touchscreen) -> Self {
        Consumer::Touchscreen(ts)
    }
}

impl From<Hwmon> for Consumer {
    fn from(hwmon: Hwmon) -> Self {
        Consumer::Hwmon(hwmon)
    }
}

impl ConversionClient for Consumer {
    fn on_select(&mut self, activating: bool) {
        match self {
            Consumer::Touchscreen(ts) => ts.on_select(activating),
            Consumer::Hwmon(hwmon) => hwmon.on_select(activating),
        }
    }

    fn on_sample(&mut self, data0: u16, data1: u16, remaining: &mut u32) {
        match self {
            Consumer::Touchscreen(ts) => ts.on_sample(data0, data1, remaining),
            Consumer::Hwmon(hwmon) => hwmon.on_sample(data0, data1, remaining),
        }
    }
}
