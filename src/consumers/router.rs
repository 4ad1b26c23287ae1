//! Routing-key dispatch: an ordered table of (pattern, handler) pairs,
//! evaluated first-match-wins. Keys that match nothing are dropped by
//! the caller with an acknowledge, which keeps the consumer forward
//! compatible with event types it does not know about.

use crate::messaging::TopicPattern;

/// Handler classes for the events the sync consumer binds. Plate and
/// tube-rack creation share a handler because both decode into the
/// same plate resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PlateCreate,
    OrderUpdate,
    PlateTransfer,
}

/// Ordered routing table.
pub struct RoutingTable {
    routes: Vec<(TopicPattern, EventKind)>,
}

impl RoutingTable {
    #[must_use]
    pub fn new(routes: &[(&str, EventKind)]) -> Self {
        Self {
            routes: routes
                .iter()
                .map(|&(pattern, kind)| (TopicPattern::new(pattern), kind))
                .collect(),
        }
    }

    /// The routes the stock plate consumer listens on.
    #[must_use]
    pub fn stock_plate() -> Self {
        Self::new(&[
            ("*.*.plate.create", EventKind::PlateCreate),
            ("*.*.tuberack.create", EventKind::PlateCreate),
            ("*.*.order.create", EventKind::OrderUpdate),
            ("*.*.order.updateorder", EventKind::OrderUpdate),
            ("*.*.platetransfer.platetransfer", EventKind::PlateTransfer),
        ])
    }

    /// Resolves a routing key to its handler class; first match wins.
    #[must_use]
    pub fn resolve(&self, routing_key: &str) -> Option<EventKind> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(routing_key))
            .map(|&(_, kind)| kind)
    }

    /// The binding patterns, in table order, for queue setup.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|(pattern, _)| pattern.as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_bound_routing_key() {
        let table = RoutingTable::stock_plate();
        assert_eq!(
            table.resolve("lab.s2.plate.create"),
            Some(EventKind::PlateCreate)
        );
        assert_eq!(
            table.resolve("lab.s2.tuberack.create"),
            Some(EventKind::PlateCreate)
        );
        assert_eq!(
            table.resolve("lab.s2.order.create"),
            Some(EventKind::OrderUpdate)
        );
        assert_eq!(
            table.resolve("lab.s2.order.updateorder"),
            Some(EventKind::OrderUpdate)
        );
        assert_eq!(
            table.resolve("lab.s2.platetransfer.platetransfer"),
            Some(EventKind::PlateTransfer)
        );
    }

    #[test]
    fn unknown_routing_keys_resolve_to_nothing() {
        let table = RoutingTable::stock_plate();
        assert_eq!(table.resolve("lab.s2.gel.create"), None);
        assert_eq!(table.resolve("lab.s2.plate.delete"), None);
        assert_eq!(table.resolve("plate.create"), None);
    }
}
