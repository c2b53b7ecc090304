//! Conversion-complete interrupt handling.
//!
//! The handler runs with the device lock held for its whole body. It reads the
//! data registers, hands the sample to the active client, and either
//! retriggers the converter for the next sample of the burst or completes the
//! request and dispatches the next waiter.

use portable_atomic::Ordering;

use crate::arbiter::{Device, DeviceState, trigger};
use crate::client::{ClientId, Completion, ConversionClient};
use crate::diag;
use crate::history::ConversionEvent;
use crate::platform::Platform;
use crate::registers::{Register, RegisterBlock, Revision};

/// Outcome reported back to the interrupt controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqReturn {
    /// The line was serviced, including spurious assertions.
    Handled,
}

/// Keeps the bits the revision actually converts.
fn mask_sample(raw: u32, revision: Revision) -> u16 {
    let mask = revision.resolution_mask();
    u16::try_from(raw & u32::from(mask)).unwrap_or(mask)
}

impl<P, H, const N: usize> Device<P, H, N>
where
    P: Platform,
    H: ConversionClient,
{
    /// Services one conversion-complete interrupt.
    pub fn on_interrupt(&self) -> IrqReturn {
        self.with_state(|state| {
            let active = state
                .active
                .filter(|id| state.samples_left(*id) > 0);
            match active {
                Some(id) => self.convert(state, id),
                None => {
                    diag::log_spurious_interrupt();
                    state.history.record(ConversionEvent::SpuriousInterrupt);
                }
            }

            if self.config.revision.has_interrupt_clear() {
                state.regs.write(Register::ClearInterrupt, 0);
            }
        });
        IrqReturn::Handled
    }

    fn convert(&self, state: &mut DeviceState<P, H, N>, id: ClientId) {
        let revision = self.config.revision;
        let data0 = mask_sample(state.regs.read(Register::Data0), revision);
        let data1 = if revision.has_second_data() {
            mask_sample(state.regs.read(Register::Data1), revision)
        } else {
            0
        };

        let Some(slot) = state.slot_mut(id) else {
            return;
        };
        slot.samples_left = slot.samples_left.saturating_sub(1);
        match slot.completion {
            Completion::Callback => {
                slot.handler
                    .on_sample(data0, data1, &mut slot.samples_left);
            }
            Completion::Signal => self.latch(id, data0),
        }
        let remaining = slot.samples_left;
        slot.handler.on_select(remaining > 0);

        diag::log_sample(id, remaining, data0, data1);
        state.history.record(ConversionEvent::SampleDelivered {
            client: id,
            data0,
            data1,
            remaining,
        });

        if remaining > 0 {
            trigger(&mut state.regs);
        } else {
            self.complete(state, id);
        }
    }

    /// Stores the value for a blocked reader and wakes it.
    fn latch(&self, id: ClientId, value: u16) {
        let index = id.index();
        if let Some(result) = self.results.get(index) {
            result.store(u32::from(value), Ordering::Release);
        }
        if let Some(signal) = self.signals.get(index) {
            signal.signal(());
        }
    }

    fn complete(&self, state: &mut DeviceState<P, H, N>, id: ClientId) {
        let was_claimed = self
            .claimed
            .get(id.index())
            .is_some_and(|claimed| claimed.swap(false, Ordering::AcqRel));
        if !was_claimed {
            diag::log_already_stopped(id);
        }
        self.set_running(id, false);
        state.active = None;
        state
            .history
            .record(ConversionEvent::Completed { client: id });
        self.dispatch(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_masked_to_revision_width() {
        assert_eq!(mask_sample(0xFFFF_FFFF, Revision::V1), 0x3FF);
        assert_eq!(mask_sample(0xFFFF_FFFF, Revision::V2), 0xFFF);
        assert_eq!(mask_sample(0x1234, Revision::V4), 0x234);
    }
}
