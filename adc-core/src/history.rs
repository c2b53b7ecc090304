//! Scheduling event history.
//!
//! Every admission, dispatch, sample and teardown decision is appended to a
//! fixed-size ring so host tooling and tests can reconstruct the order in
//! which the converter was handed out. The ring keeps the newest
//! [`HISTORY_CAPACITY`] records and drops the oldest silently.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::client::ClientId;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of events retained in memory.
pub const HISTORY_CAPACITY: usize = 64;

/// Scheduling decisions taken by the arbiter and the conversion handler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConversionEvent {
    Queued {
        client: ClientId,
        priority: bool,
    },
    Dispatched {
        client: ClientId,
        channel: u8,
    },
    SampleDelivered {
        client: ClientId,
        data0: u16,
        data1: u16,
        remaining: u32,
    },
    Completed {
        client: ClientId,
    },
    Stopped {
        client: ClientId,
        was_active: bool,
    },
    Standby,
    SpuriousInterrupt,
    ReadTimeout {
        client: ClientId,
        consecutive: u8,
    },
}

impl ConversionEvent {
    /// Client the event refers to, if any.
    #[must_use]
    pub const fn client(&self) -> Option<ClientId> {
        match *self {
            ConversionEvent::Queued { client, .. }
            | ConversionEvent::Dispatched { client, .. }
            | ConversionEvent::SampleDelivered { client, .. }
            | ConversionEvent::Completed { client }
            | ConversionEvent::Stopped { client, .. }
            | ConversionEvent::ReadTimeout { client, .. } => Some(client),
            ConversionEvent::Standby | ConversionEvent::SpuriousInterrupt => None,
        }
    }
}

impl fmt::Display for ConversionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionEvent::Queued { client, priority } => {
                let slot = if *priority { "priority" } else { "fifo" };
                write!(f, "queued {client} ({slot})")
            }
            ConversionEvent::Dispatched { client, channel } => {
                write!(f, "dispatched {client} ch={channel}")
            }
            ConversionEvent::SampleDelivered {
                client,
                data0,
                data1,
                remaining,
            } => write!(
                f,
                "sample {client} d0=0x{data0:03x} d1=0x{data1:03x} left={remaining}"
            ),
            ConversionEvent::Completed { client } => write!(f, "completed {client}"),
            ConversionEvent::Stopped { client, was_active } => {
                if *was_active {
                    write!(f, "stopped {client} (active)")
                } else {
                    write!(f, "stopped {client}")
                }
            }
            ConversionEvent::Standby => f.write_str("standby"),
            ConversionEvent::SpuriousInterrupt => f.write_str("spurious-interrupt"),
            ConversionEvent::ReadTimeout {
                client,
                consecutive,
            } => write!(f, "read-timeout {client} errors={consecutive}"),
        }
    }
}

/// Event stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EventRecord {
    pub id: EventId,
    pub event: ConversionEvent,
}

/// Records scheduling events into a fixed-size ring buffer.
pub struct EventHistory<const CAPACITY: usize = HISTORY_CAPACITY> {
    ring: HistoryBuf<EventRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> EventHistory<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Appends an event and returns its identifier.
    pub fn record(&mut self, event: ConversionEvent) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(EventRecord { id, event });
        id
    }

    /// Returns an iterator over the recorded events in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, EventRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&EventRecord> {
        self.ring.recent()
    }

    /// Client ids in the order they were handed the converter.
    pub fn dispatch_order(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.oldest_first().filter_map(|record| match record.event {
            ConversionEvent::Dispatched { client, .. } => Some(client),
            _ => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Drops every record; identifiers keep increasing.
    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

impl<const CAPACITY: usize> Default for EventHistory<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: usize) -> ClientId {
        ClientId::from_index(raw).expect("index fits")
    }

    #[test]
    fn records_get_increasing_ids() {
        let mut history = EventHistory::<4>::new();
        let first = history.record(ConversionEvent::Standby);
        let second = history.record(ConversionEvent::SpuriousInterrupt);

        assert_eq!(second, first + 1);
        assert_eq!(
            history.latest().map(|record| record.event),
            Some(ConversionEvent::SpuriousInterrupt)
        );
    }

    #[test]
    fn ring_keeps_only_the_newest_records() {
        let mut history = EventHistory::<2>::new();
        history.record(ConversionEvent::Dispatched {
            client: id(0),
            channel: 0,
        });
        history.record(ConversionEvent::Dispatched {
            client: id(1),
            channel: 1,
        });
        history.record(ConversionEvent::Dispatched {
            client: id(2),
            channel: 2,
        });

        assert_eq!(history.len(), 2);
        let mut order = history.dispatch_order();
        assert_eq!(order.next(), Some(id(1)));
        assert_eq!(order.next(), Some(id(2)));
        assert_eq!(order.next(), None);
    }

    #[test]
    fn clear_keeps_id_sequence() {
        let mut history = EventHistory::<4>::new();
        history.record(ConversionEvent::Standby);
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.record(ConversionEvent::Standby), 1);
    }

    #[test]
    fn events_expose_their_client() {
        let event = ConversionEvent::Completed { client: id(3) };
        assert_eq!(event.client(), Some(id(3)));
        assert_eq!(ConversionEvent::Standby.client(), None);
    }
}
