//! Converter arbiter.
//!
//! One [`Device`] owns the converter. Ordinary clients queue in arrival order;
//! a single priority client (the touchscreen) is always served before the
//! queue. Scheduling state sits behind one critical-section lock shared with
//! the conversion interrupt handler, while the per-client claim, running and
//! result cells are atomics so the fast paths can test them without the lock.

mod status;

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::client::{
    Client, ClientId, ClientRole, ClientSlot, Completion, ConversionClient, MAX_CLIENTS,
};
use crate::config::AdcConfig;
use crate::diag;
use crate::error::AdcError;
use crate::history::{ConversionEvent, EventHistory};
use crate::platform::Platform;
use crate::queue::PendingQueue;
use crate::registers::{Bank, MUX_CHANNEL_MASK, Register, RegisterBlock, con};

pub use status::DeviceStatus;

/// Marker stored in a result cell until a conversion latches a value.
pub(crate) const UNSET_RESULT: u32 = u32::MAX;

/// Scheduling state guarded by the device lock.
pub(crate) struct DeviceState<P: Platform, H, const N: usize> {
    pub platform: P,
    pub regs: P::Registers,
    pub clients: [Option<ClientSlot<H>>; N],
    pub active: Option<ClientId>,
    pub priority: Option<ClientId>,
    pub pending: PendingQueue<N>,
    pub history: EventHistory,
    pub suspended: bool,
}

impl<P: Platform, H, const N: usize> DeviceState<P, H, N> {
    pub fn slot(&self, id: ClientId) -> Option<&ClientSlot<H>> {
        self.clients.get(id.index()).and_then(Option::as_ref)
    }

    pub fn slot_mut(&mut self, id: ClientId) -> Option<&mut ClientSlot<H>> {
        self.clients.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn samples_left(&self, id: ClientId) -> u32 {
        self.slot(id).map_or(0, |slot| slot.samples_left)
    }
}

impl<P: Platform, H: ConversionClient, const N: usize> DeviceState<P, H, N> {
    /// Routes the converter to `id` and returns the channel it was pointed at.
    ///
    /// Priority clients program their own routing from `on_select`, so the
    /// multiplexer is left alone for them.
    fn select(&mut self, id: ClientId, config: &AdcConfig) -> u8 {
        let Some(slot) = self.clients.get_mut(id.index()).and_then(Option::as_mut) else {
            return 0;
        };
        slot.handler.on_select(true);

        let mut control = self.regs.read(Register::Control);
        control &= !(con::MUX_MASK | con::STANDBY | con::START_MASK);
        control |= con::PRESCALER_ENABLE;
        if !slot.role.is_priority() {
            if config.revision.has_mux_register() {
                self.regs.write(
                    Register::Mux,
                    u32::from(slot.channel) & MUX_CHANNEL_MASK,
                );
            } else {
                control |= con::select_mux(slot.channel);
            }
        }
        self.regs.write(Register::Control, control);
        slot.channel
    }
}

/// Requests the next conversion.
pub(crate) fn trigger<R: RegisterBlock>(regs: &mut R) {
    regs.modify(Register::Control, |control| control | con::ENABLE_START);
}

fn flag_set(flags: &[AtomicBool], index: usize) -> bool {
    flags
        .get(index)
        .is_some_and(|flag| flag.load(Ordering::Acquire))
}

/// Writes the control word used while the converter is powered.
fn program_control<R: RegisterBlock>(regs: &mut R, config: &AdcConfig, standby: bool) {
    if config.second_bank {
        regs.select_bank(Bank::Primary);
        regs.modify(Register::Control, |control| control | con::TOUCH_BANK_SELECT);
        regs.select_bank(Bank::Secondary);
    }

    let mut control = con::prescaler(config.prescaler) | con::PRESCALER_ENABLE;
    if config.revision.has_resolution_select() {
        control |= con::RESOLUTION_SELECT;
    }
    if standby {
        control |= con::STANDBY;
    }
    regs.write(Register::Control, control);
}

/// Shared converter arbitrated between up to `N` registered clients.
pub struct Device<P: Platform, H, const N: usize = MAX_CLIENTS> {
    pub(crate) config: AdcConfig,
    pub(crate) state: Mutex<RefCell<DeviceState<P, H, N>>>,
    pub(crate) priority_waiting: AtomicBool,
    pub(crate) claimed: [AtomicBool; N],
    pub(crate) running: [AtomicBool; N],
    pub(crate) results: [AtomicU32; N],
    pub(crate) signals: [Signal<CriticalSectionRawMutex, ()>; N],
}

impl<P, H, const N: usize> Device<P, H, N>
where
    P: Platform,
    H: ConversionClient,
{
    /// Brings the converter up: clock, registers, standby control word and
    /// interrupt line, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`AdcError::ResourceUnavailable`] naming the first resource the
    /// platform could not provide. Everything acquired before it is released.
    pub fn probe(mut platform: P, config: AdcConfig) -> Result<Self, AdcError> {
        platform.acquire_clock()?;
        let mut regs = match platform.map_registers() {
            Ok(regs) => regs,
            Err(err) => {
                platform.release_clock();
                return Err(err);
            }
        };

        platform.set_clock_enabled(true);
        program_control(&mut regs, &config, true);

        if let Err(err) = platform.request_irq() {
            platform.set_clock_enabled(false);
            platform.release_clock();
            return Err(err);
        }

        diag::log_attached(config.revision, config.second_bank);

        Ok(Self {
            config,
            state: Mutex::new(RefCell::new(DeviceState {
                platform,
                regs,
                clients: core::array::from_fn(|_| None),
                active: None,
                priority: None,
                pending: PendingQueue::new(),
                history: EventHistory::new(),
                suspended: false,
            })),
            priority_waiting: AtomicBool::new(false),
            claimed: [const { AtomicBool::new(false) }; N],
            running: [const { AtomicBool::new(false) }; N],
            results: [const { AtomicU32::new(UNSET_RESULT) }; N],
            signals: [const { Signal::new() }; N],
        })
    }

    /// Releases the interrupt line and the clock and hands the platform back.
    #[must_use]
    pub fn remove(self) -> P {
        let DeviceState { mut platform, .. } = self.state.into_inner().into_inner();
        platform.free_irq();
        platform.set_clock_enabled(false);
        platform.release_clock();
        diag::log_detached();
        platform
    }

    /// Puts the converter in standby and gates its interrupt and clock.
    pub fn suspend(&self) {
        self.with_state(|state| {
            state
                .regs
                .modify(Register::Control, |control| control | con::STANDBY);
            state.platform.set_irq_enabled(false);
            state.suspended = true;
        });
        self.with_state(|state| state.platform.set_clock_enabled(false));
        diag::log_power(true);
    }

    /// Restores clock and interrupt and reprograms the control word out of
    /// standby.
    pub fn resume(&self) {
        self.with_state(|state| {
            state.platform.set_clock_enabled(true);
            state.platform.set_irq_enabled(true);
            program_control(&mut state.regs, &self.config, false);
            state.suspended = false;
        });
        diag::log_power(false);
    }

    /// Registers a consumer and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`AdcError::InvalidArgument`] for an empty owner name and
    /// [`AdcError::NoMemory`] when every slot is taken.
    pub fn register(
        &self,
        owner: &'static str,
        handler: H,
        role: ClientRole,
    ) -> Result<Client, AdcError> {
        if owner.is_empty() {
            return Err(AdcError::InvalidArgument);
        }

        self.with_state(|state| {
            let index = state
                .clients
                .iter()
                .position(Option::is_none)
                .ok_or(AdcError::NoMemory)?;
            let id = ClientId::from_index(index).ok_or(AdcError::NoMemory)?;

            self.reset_cells(index);
            state.clients[index] = Some(ClientSlot::new(owner, handler, role));
            Ok(Client::new(id, role))
        })
    }

    /// Withdraws the client from scheduling and frees its slot.
    ///
    /// Returns the handler so the caller can reclaim whatever it collected.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn release(&self, client: Client) -> Option<H> {
        let id = client.id();
        self.with_state(|state| {
            if state.slot(id).is_some() {
                self.stop_locked(state, id, false);
            }
            let slot = state.clients.get_mut(id.index())?.take()?;
            self.reset_cells(id.index());
            Some(slot.handler)
        })
    }

    /// Requests `samples` conversions on `channel`.
    ///
    /// Ordinary clients join the tail of the queue; the priority client takes
    /// the dedicated slot. If the converter is idle the request is dispatched
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`AdcError::Busy`] if this client already has a request in
    /// flight or the priority slot is occupied, and
    /// [`AdcError::InvalidArgument`] for a zero sample count, an out-of-range
    /// channel, or a handle this device did not issue.
    pub fn start(
        &self,
        client: &Client,
        channel: u8,
        samples: u32,
        completion: Completion,
    ) -> Result<(), AdcError> {
        if samples == 0 || channel >= self.config.revision.channel_count() {
            return Err(AdcError::InvalidArgument);
        }
        let claimed = self
            .claimed
            .get(client.index())
            .ok_or(AdcError::InvalidArgument)?;

        if client.is_priority() && self.priority_waiting.load(Ordering::Acquire) {
            return Err(AdcError::Busy);
        }
        if claimed.swap(true, Ordering::AcqRel) {
            diag::log_already_running(client.id());
            return Err(AdcError::Busy);
        }

        let admitted =
            self.with_state(|state| self.admit(state, client, channel, samples, completion));
        if admitted.is_err() {
            claimed.store(false, Ordering::Release);
        }
        admitted
    }

    fn admit(
        &self,
        state: &mut DeviceState<P, H, N>,
        client: &Client,
        channel: u8,
        samples: u32,
        completion: Completion,
    ) -> Result<(), AdcError> {
        let id = client.id();
        if state.slot(id).is_none_or(|slot| slot.role != client.role()) {
            return Err(AdcError::InvalidArgument);
        }
        let priority = client.is_priority();
        // The fast-path check ran without the lock.
        if priority && state.priority.is_some() {
            return Err(AdcError::Busy);
        }

        if let Some(slot) = state.slot_mut(id) {
            slot.channel = channel;
            slot.samples_left = samples;
            slot.completion = completion;
        }

        let index = id.index();
        if let Some(result) = self.results.get(index) {
            result.store(UNSET_RESULT, Ordering::Release);
        }
        if completion == Completion::Signal {
            if let Some(signal) = self.signals.get(index) {
                signal.reset();
            }
        }

        if priority {
            state.priority = Some(id);
            self.priority_waiting.store(true, Ordering::Release);
        } else if state.pending.push_back(id).is_err() {
            return Err(AdcError::Busy);
        }
        state
            .history
            .record(ConversionEvent::Queued { client: id, priority });

        if state.active.is_none() {
            self.dispatch(state);
        }
        Ok(())
    }

    /// Withdraws any pending or active request of `client`.
    ///
    /// Stopping a client that is not running only logs a warning.
    pub fn stop(&self, client: &Client) {
        self.with_state(|state| self.stop_locked(state, client.id(), true));
    }

    pub(crate) fn stop_locked(&self, state: &mut DeviceState<P, H, N>, id: ClientId, warn: bool) {
        let was_active = state.active == Some(id);
        if was_active {
            state.active = None;
        }
        if state.priority == Some(id) {
            state.priority = None;
            self.priority_waiting.store(false, Ordering::Release);
        } else {
            state.pending.remove(id);
        }

        let was_claimed = self
            .claimed
            .get(id.index())
            .is_some_and(|claimed| claimed.swap(false, Ordering::AcqRel));
        if !was_claimed && warn {
            diag::log_already_stopped(id);
        }
        self.set_running(id, false);

        if was_claimed || was_active {
            state.history.record(ConversionEvent::Stopped {
                client: id,
                was_active,
            });
        }
        if state.active.is_none() {
            self.dispatch(state);
        }
    }

    /// Hands the converter to the next waiter, or parks it in standby.
    pub(crate) fn dispatch(&self, state: &mut DeviceState<P, H, N>) {
        let next = match state.priority.take() {
            Some(id) => {
                self.priority_waiting.store(false, Ordering::Release);
                Some(id)
            }
            None => state.pending.pop_front(),
        };

        let Some(id) = next else {
            state.regs.modify(Register::Control, |control| {
                (control & !con::PRESCALER_ENABLE) | con::STANDBY
            });
            state.history.record(ConversionEvent::Standby);
            return;
        };

        state.active = Some(id);
        self.set_running(id, true);
        let channel = state.select(id, &self.config);
        trigger(&mut state.regs);
        state
            .history
            .record(ConversionEvent::Dispatched { client: id, channel });
        diag::log_dispatch(id, channel);
        diag::log_registers(&mut state.regs);
    }

    pub(crate) fn set_running(&self, id: ClientId, running: bool) {
        if let Some(flag) = self.running.get(id.index()) {
            flag.store(running, Ordering::Release);
        }
    }

    fn reset_cells(&self, index: usize) {
        if let Some(claimed) = self.claimed.get(index) {
            claimed.store(false, Ordering::Release);
        }
        if let Some(running) = self.running.get(index) {
            running.store(false, Ordering::Release);
        }
        if let Some(result) = self.results.get(index) {
            result.store(UNSET_RESULT, Ordering::Release);
        }
        if let Some(signal) = self.signals.get(index) {
            signal.reset();
        }
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut DeviceState<P, H, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Consistent snapshot of the scheduling state.
    #[must_use]
    pub fn status(&self) -> DeviceStatus<N> {
        self.with_state(|state| {
            let mut status = DeviceStatus {
                active: state.active,
                priority: state.priority,
                standby: state.regs.read(Register::Control) & con::STANDBY != 0,
                suspended: state.suspended,
                ..DeviceStatus::default()
            };
            for id in state.pending.iter() {
                let _ = status.pending.push(id);
            }
            for (index, slot) in state.clients.iter().enumerate() {
                let Some(id) = slot.as_ref().and(ClientId::from_index(index)) else {
                    continue;
                };
                if flag_set(&self.running, index) {
                    let _ = status.running.push(id);
                }
                if flag_set(&self.claimed, index) {
                    let _ = status.claimed.push(id);
                }
            }
            status
        })
    }

    /// Whether `client` has a request pending or in flight.
    #[must_use]
    pub fn is_claimed(&self, client: &Client) -> bool {
        flag_set(&self.claimed, client.index())
    }

    /// Whether `client` currently owns the converter.
    #[must_use]
    pub fn is_running(&self, client: &Client) -> bool {
        flag_set(&self.running, client.index())
    }

    /// Consecutive read timeouts of `client`.
    #[must_use]
    pub fn error_count(&self, client: &Client) -> u8 {
        self.with_state(|state| state.slot(client.id()).map_or(0, |slot| slot.error_count))
    }

    /// Name the client registered under.
    #[must_use]
    pub fn owner(&self, client: &Client) -> Option<&'static str> {
        self.with_state(|state| state.slot(client.id()).map(|slot| slot.owner))
    }

    #[must_use]
    pub const fn config(&self) -> &AdcConfig {
        &self.config
    }

    /// Runs `f` on the handler of `client` under the device lock.
    pub fn with_handler<R>(&self, client: &Client, f: impl FnOnce(&mut H) -> R) -> Option<R> {
        self.with_state(|state| state.slot_mut(client.id()).map(|slot| f(&mut slot.handler)))
    }

    /// Runs `f` on the register block under the device lock.
    pub fn with_registers<R>(&self, f: impl FnOnce(&mut P::Registers) -> R) -> R {
        self.with_state(|state| f(&mut state.regs))
    }

    pub fn with_platform<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        self.with_state(|state| f(&mut state.platform))
    }

    pub fn with_history<R>(&self, f: impl FnOnce(&EventHistory) -> R) -> R {
        self.with_state(|state| f(&state.history))
    }
}
