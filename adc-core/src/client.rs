//! Client handles and the per-client state held by the arbiter.
//!
//! A consumer registers once and receives a [`Client`] handle. The handle only
//! carries the slot identity and role; everything the scheduler mutates lives
//! in a [`ClientSlot`] inside the device so the interrupt handler can reach it
//! under the device lock.

use core::fmt;

/// Default number of client slots per device.
pub const MAX_CLIENTS: usize = 8;

/// Slot identity of a registered client.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClientId(u8);

impl ClientId {
    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(Self)
    }

    /// Index of the slot backing this client.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw identifier, used by log sites.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client{}", self.0)
    }
}

/// Scheduling role assigned at registration.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ClientRole {
    /// Served in arrival order.
    #[default]
    Ordinary,
    /// Touchscreen role: owns the dedicated slot ahead of the FIFO.
    Priority,
}

impl ClientRole {
    #[must_use]
    pub const fn is_priority(self) -> bool {
        matches!(self, ClientRole::Priority)
    }
}

/// How completed samples are handed back for a request.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Completion {
    /// Stream every sample through [`ConversionClient::on_sample`].
    #[default]
    Callback,
    /// Latch the first value into the client's result cell and wake the
    /// waiter parked on the client's completion signal.
    Signal,
}

/// Behaviour a consumer plugs into the scheduler.
///
/// Both hooks run in interrupt context with the device lock held: they must
/// not block and must not call back into the device.
pub trait ConversionClient {
    /// Called with `true` before each conversion of this client starts and
    /// with `false` once its burst is finished.
    fn on_select(&mut self, activating: bool) {
        let _ = activating;
    }

    /// Delivers one completed sample. `remaining` has already been decremented
    /// for this sample; raising it extends the burst, lowering it cuts it short.
    fn on_sample(&mut self, data0: u16, data1: u16, remaining: &mut u32);
}

/// Handle owned by the registrant. Not `Clone`: releasing consumes it.
#[derive(Debug, Eq, PartialEq)]
pub struct Client {
    id: ClientId,
    role: ClientRole,
}

impl Client {
    pub(crate) const fn new(id: ClientId, role: ClientRole) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    #[must_use]
    pub const fn role(&self) -> ClientRole {
        self.role
    }

    #[must_use]
    pub const fn is_priority(&self) -> bool {
        self.role.is_priority()
    }

    pub(crate) const fn index(&self) -> usize {
        self.id.index()
    }
}

/// Scheduler-side state of one registered client.
pub(crate) struct ClientSlot<H> {
    pub owner: &'static str,
    pub handler: H,
    pub role: ClientRole,
    pub channel: u8,
    pub samples_left: u32,
    pub completion: Completion,
    pub error_count: u8,
}

impl<H> ClientSlot<H> {
    pub const fn new(owner: &'static str, handler: H, role: ClientRole) -> Self {
        Self {
            owner,
            handler,
            role,
            channel: 0,
            samples_left: 0,
            completion: Completion::Callback,
            error_count: 0,
        }
    }
}
