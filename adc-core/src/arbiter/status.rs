use core::fmt;

use heapless::Vec;

use crate::client::ClientId;

/// Snapshot of the scheduling state taken under the device lock.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceStatus<const N: usize> {
    /// Client whose conversion is in flight.
    pub active: Option<ClientId>,
    /// Priority client waiting for the converter.
    pub priority: Option<ClientId>,
    /// Ordinary clients waiting, head first.
    pub pending: Vec<ClientId, N>,
    /// Clients whose running flag is set.
    pub running: Vec<ClientId, N>,
    /// Clients with a request pending or in flight.
    pub claimed: Vec<ClientId, N>,
    pub standby: bool,
    pub suspended: bool,
}

impl<const N: usize> DeviceStatus<N> {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.priority.is_none() && self.pending.is_empty()
    }

    /// Whether the scheduler still holds any reference to `id`.
    #[must_use]
    pub fn references(&self, id: ClientId) -> bool {
        self.active == Some(id)
            || self.priority == Some(id)
            || self.pending.contains(&id)
            || self.running.contains(&id)
            || self.claimed.contains(&id)
    }
}

impl<const N: usize> fmt::Display for DeviceStatus<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.active {
            Some(id) => write!(f, "active={id}")?,
            None => f.write_str("active=none")?,
        }
        match self.priority {
            Some(id) => write!(f, " priority={id}")?,
            None => f.write_str(" priority=none")?,
        }
        f.write_str(" pending=[")?;
        for (position, id) in self.pending.iter().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("]")?;
        if self.standby {
            f.write_str(" standby")?;
        }
        if self.suspended {
            f.write_str(" suspended")?;
        }
        Ok(())
    }
}
