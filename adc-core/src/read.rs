//! Blocking single-sample read on top of the scheduler.

use embassy_time::{Duration as EmbassyDuration, with_timeout};
use portable_atomic::Ordering;

use crate::arbiter::{Device, UNSET_RESULT};
use crate::client::{Client, Completion, ConversionClient};
use crate::diag;
use crate::error::AdcError;
use crate::history::ConversionEvent;
use crate::platform::Platform;

fn core_duration_to_embassy(duration: core::time::Duration) -> EmbassyDuration {
    let micros = duration.as_micros();
    let clamped = u64::try_from(micros).unwrap_or(u64::MAX);
    EmbassyDuration::from_micros(clamped)
}

impl<P, H, const N: usize> Device<P, H, N>
where
    P: Platform,
    H: ConversionClient,
{
    /// Converts one sample on `channel` and waits for it, bounded by the
    /// configured read timeout.
    ///
    /// # Errors
    ///
    /// Propagates [`AdcError::Busy`] and [`AdcError::InvalidArgument`] from
    /// [`Device::start`], and returns [`AdcError::Timeout`] when no sample
    /// arrived in time. A timed-out request is stopped before returning.
    ///
    /// # Panics
    ///
    /// Panics once `client` has timed out more than
    /// `max_consecutive_errors` times in a row: the converter is assumed to
    /// be wedged and continuing would only hide the fault.
    pub async fn read(&self, client: &Client, channel: u8) -> Result<u16, AdcError> {
        let index = client.index();
        let (Some(signal), Some(result)) = (self.signals.get(index), self.results.get(index))
        else {
            return Err(AdcError::InvalidArgument);
        };

        self.start(client, channel, 1, Completion::Signal)?;

        // Expiry is detected through the result cell below.
        let _ = with_timeout(
            core_duration_to_embassy(self.config.read_timeout),
            signal.wait(),
        )
        .await;

        match result.load(Ordering::Acquire) {
            UNSET_RESULT => Err(self.read_timed_out(client)),
            value => {
                self.settle(client);
                Ok(u16::try_from(value).unwrap_or(u16::MAX))
            }
        }
    }

    /// Passes through the device lock once, so the interrupt handler that
    /// latched the result has left its critical section, and clears the
    /// timeout streak.
    fn settle(&self, client: &Client) {
        self.with_state(|state| {
            if let Some(slot) = state.slot_mut(client.id()) {
                slot.error_count = 0;
            }
        });
    }

    fn read_timed_out(&self, client: &Client) -> AdcError {
        let id = client.id();
        self.stop(client);

        let consecutive = self.with_state(|state| {
            let count = state.slot_mut(id).map_or(0, |slot| {
                slot.error_count = slot.error_count.saturating_add(1);
                slot.error_count
            });
            state.history.record(ConversionEvent::ReadTimeout {
                client: id,
                consecutive: count,
            });
            count
        });
        diag::log_read_timeout(id, consecutive);

        if consecutive > self.config.max_consecutive_errors {
            diag::log_wedged(id, consecutive);
            panic!("adc: {id} timed out {consecutive} times in a row, converter wedged");
        }
        AdcError::Timeout
    }
}
