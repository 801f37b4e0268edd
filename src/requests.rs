//! Request tracking
//!
//! Asynchronous responses can arrive out of order. Each request is issued a
//! [`RequestTicket`]; only the most recently issued ticket may apply its response.

/// Ticket identifying one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

/// Issues tickets and remembers which one is current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    /// New tracker with no request in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding every earlier one.
    pub fn issue(&mut self) -> RequestTicket {
        self.latest = self.latest.wrapping_add(1);

        RequestTicket(self.latest)
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Supersede every ticket issued so far without starting a new request.
    pub fn invalidate(&mut self) {
        self.latest = self.latest.wrapping_add(1);
    }
}
