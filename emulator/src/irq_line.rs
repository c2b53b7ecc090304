//! Simulated conversion-complete interrupt line.
//!
//! A background thread watches the start requests counted by the register
//! file and completes each one with a synthetic sample. In manual mode the
//! requests stay pending until the console fires the line by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use adc_core::Revision;

use crate::session::AdcDevice;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sample values loaded into the data registers for one conversion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sample {
    pub channel: u8,
    pub data0: u16,
    pub data1: u16,
}

/// Deterministic per-channel value with a little jitter so bursts differ.
pub fn synthetic_sample(revision: Revision, channel: u8, sequence: u32) -> Sample {
    let mask = revision.resolution_mask();
    let jitter = u16::try_from(sequence % 8).unwrap_or(0);
    let base = u16::from(channel).wrapping_add(1).wrapping_mul(0x0F0);
    Sample {
        channel,
        data0: base.wrapping_add(jitter) & mask,
        data1: mask.wrapping_sub(base).wrapping_sub(jitter) & mask,
    }
}

struct LineState {
    auto: AtomicBool,
    shutdown: AtomicBool,
    serviced: AtomicU32,
}

pub struct IrqLine {
    device: &'static AdcDevice,
    state: Arc<LineState>,
    worker: Option<JoinHandle<()>>,
}

impl IrqLine {
    /// Starts the line in automatic mode.
    pub fn spawn(device: &'static AdcDevice) -> Self {
        let state = Arc::new(LineState {
            auto: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            serviced: AtomicU32::new(0),
        });

        let worker = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                while !state.shutdown.load(Ordering::Acquire) {
                    if !state.auto.load(Ordering::Acquire) || service_one(device, &state).is_none()
                    {
                        thread::sleep(POLL_INTERVAL);
                    }
                }
            })
        };

        Self {
            device,
            state,
            worker: Some(worker),
        }
    }

    pub fn set_auto(&self, auto: bool) {
        self.state.auto.store(auto, Ordering::Release);
    }

    pub fn is_auto(&self) -> bool {
        self.state.auto.load(Ordering::Acquire)
    }

    /// Raises the line once. Completes the oldest outstanding conversion if
    /// there is one, otherwise delivers a spurious interrupt. Nothing reaches
    /// the handler while the line is masked.
    pub fn fire(&self) -> Option<Sample> {
        if !line_enabled(self.device) {
            return None;
        }
        let sample = service_one(self.device, &self.state);
        if sample.is_none() {
            self.device.on_interrupt();
        }
        sample
    }

    /// Conversions started but not yet completed by the line.
    pub fn outstanding(&self) -> u32 {
        let triggers = self.device.with_registers(|regs| regs.triggers());
        triggers.wrapping_sub(self.state.serviced.load(Ordering::Acquire))
    }
}

impl Drop for IrqLine {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn line_enabled(device: &AdcDevice) -> bool {
    device.with_platform(|platform| platform.irq_enabled())
}

fn service_one(device: &AdcDevice, state: &LineState) -> Option<Sample> {
    if !line_enabled(device) {
        return None;
    }

    let revision = device.config().revision;
    let sample = device.with_registers(|regs| {
        let serviced = state.serviced.load(Ordering::Acquire);
        if regs.triggers() == serviced {
            return None;
        }
        state.serviced.store(serviced.wrapping_add(1), Ordering::Release);

        let sample = synthetic_sample(revision, regs.selected_channel(revision), serviced);
        regs.load_sample(u32::from(sample.data0), u32::from(sample.data1));
        Some(sample)
    })?;

    device.on_interrupt();
    Some(sample)
}

#[cfg(test)]
mod tests {
    use adc_core::consumers::{Consumer, Hwmon};
    use adc_core::{AdcConfig, Client, Completion, Device, HostPlatform};

    use super::*;

    fn leaked_device() -> &'static AdcDevice {
        let device = Device::probe(HostPlatform::new(), AdcConfig::new(Revision::V2))
            .expect("probe should succeed");
        Box::leak(Box::new(device))
    }

    fn readings(device: &AdcDevice, client: &Client) -> Option<u32> {
        device.with_handler(client, |consumer| match consumer {
            Consumer::Hwmon(hwmon) => hwmon.readings(),
            Consumer::Touchscreen(_) => 0,
        })
    }

    #[test]
    fn masked_line_delivers_nothing_until_resume() {
        let device = leaked_device();
        let line = IrqLine::spawn(device);
        line.set_auto(false);

        let consumer = Consumer::from(Hwmon::new());
        let role = consumer.role();
        let client = device.register("vbat", consumer, role).expect("slot available");

        device.suspend();
        device
            .start(&client, 1, 1, Completion::Callback)
            .expect("admitted");

        assert_eq!(line.fire(), None);
        assert_eq!(readings(device, &client), Some(0));
        assert!(device.is_running(&client), "the conversion is still outstanding");
        assert_eq!(line.outstanding(), 1);

        device.resume();
        assert!(line.fire().is_some(), "the held conversion completes after resume");
        assert_eq!(readings(device, &client), Some(1));
        assert!(!device.is_running(&client));
        assert_eq!(line.outstanding(), 0);
    }

    #[test]
    fn synthetic_samples_track_channel_and_resolution() {
        let low = synthetic_sample(Revision::V2, 0, 0);
        let high = synthetic_sample(Revision::V2, 7, 0);
        assert!(high.data0 > low.data0);

        let ten_bit = synthetic_sample(Revision::V1, 9, 5);
        assert!(ten_bit.data0 <= 0x3FF);
        assert!(ten_bit.data1 <= 0x3FF);
    }
}
