//! Log sites for the arbiter and the conversion handler.
//!
//! Firmware builds enable the `defmt` feature; host builds compile every site
//! to a no-op so the core stays free of a logging backend.

use crate::client::ClientId;
#[cfg(feature = "defmt")]
use crate::registers::Register;
use crate::registers::{RegisterBlock, Revision};

#[cfg(feature = "defmt")]
pub(crate) fn log_attached(revision: Revision, second_bank: bool) {
    defmt::info!(
        "adc: attached {=str} driver (second bank: {=bool})",
        revision.device_id(),
        second_bank
    );
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_attached(_: Revision, _: bool) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_detached() {
    defmt::info!("adc: detached");
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_detached() {}

#[cfg(feature = "defmt")]
pub(crate) fn log_power(suspended: bool) {
    if suspended {
        defmt::info!("adc: suspended");
    } else {
        defmt::info!("adc: resumed");
    }
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_power(_: bool) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_dispatch(client: ClientId, channel: u8) {
    defmt::debug!("adc: new client is {=u8} ch={=u8}", client.raw(), channel);
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_dispatch(_: ClientId, _: u8) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_registers<R: RegisterBlock>(regs: &mut R) {
    let control = regs.read(Register::Control);
    let delay = regs.read(Register::Delay);
    defmt::debug!("adc: CON={=u32:08x}, DLY={=u32:08x}", control, delay);
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_registers<R: RegisterBlock>(_: &mut R) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_sample(client: ClientId, remaining: u32, data0: u16, data1: u16) {
    defmt::trace!(
        "adc: read {=u8} left={=u32}: 0x{=u16:04x}, 0x{=u16:04x}",
        client.raw(),
        remaining,
        data0,
        data1
    );
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_sample(_: ClientId, _: u32, _: u16, _: u16) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_already_running(client: ClientId) {
    defmt::warn!("adc: start: client {=u8} is already running", client.raw());
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_already_running(_: ClientId) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_already_stopped(client: ClientId) {
    defmt::warn!("adc: client {=u8} is already stopped", client.raw());
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_already_stopped(_: ClientId) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_spurious_interrupt() {
    defmt::warn!("adc: irq: no adc pending");
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_spurious_interrupt() {}

#[cfg(feature = "defmt")]
pub(crate) fn log_read_timeout(client: ClientId, consecutive: u8) {
    defmt::warn!(
        "adc: read: client {=u8} timed out ({=u8} in a row)",
        client.raw(),
        consecutive
    );
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_read_timeout(_: ClientId, _: u8) {}

#[cfg(feature = "defmt")]
pub(crate) fn log_wedged(client: ClientId, consecutive: u8) {
    defmt::error!(
        "adc: converter wedged: client {=u8} timed out {=u8} times in a row",
        client.raw(),
        consecutive
    );
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_wedged(_: ClientId, _: u8) {}
