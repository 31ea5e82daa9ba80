//! This module is used for collection of runtime metrics of a `relaymesh`
//! node. The main item of interest is the [`Metrics`] trait. Users can
//! provide their own implementation of this, or use the default provided
//! implementation to disable gathering metrics.

/// The collection of all metrics exported by a [`relaymesh
/// node`](crate::Node). It is up to the user to provide an implementation
/// which implements the methods for metrics they are interested in. All
/// methods have a default implementation, so if the user is not interested in
/// any metrics, a NOOP handler can be implemented as follows:
///
/// ```rust
/// use relaymesh::metrics::Metrics;
///
/// #[derive(Clone)]
/// struct NoMetrics;
/// impl Metrics for NoMetrics {}
/// ```
pub trait Metrics {
    /// The [`Router`](crate::router::Router) processed a HELLO from a
    /// neighbour.
    #[inline]
    fn router_process_hello(&self) {}

    /// The [`Router`](crate::router::Router) processed a TC message.
    #[inline]
    fn router_process_tc(&self) {}

    /// The [`Router`](crate::router::Router) dropped an inbound message
    /// before processing, because it failed validation.
    #[inline]
    fn router_invalid_message(&self) {}

    /// The [`Router`](crate::router::Router) dropped a flooded message which
    /// was already processed earlier.
    #[inline]
    fn router_duplicate_dropped(&self) {}

    /// The [`Router`](crate::router::Router) re-queued a TC for MPR
    /// flooding.
    #[inline]
    fn router_tc_forwarded(&self) {}

    /// A new neighbour appeared in the neighbour table.
    #[inline]
    fn router_neighbour_added(&self) {}

    /// A neighbour was removed after exceeding the HELLO timeout.
    #[inline]
    fn router_neighbour_expired(&self) {}

    /// The MPR selection procedure ran.
    #[inline]
    fn router_mpr_selection_ran(&self) {}

    /// The shortest path computation ran and the routing table was rebuilt.
    #[inline]
    fn router_routes_recomputed(&self) {}

    /// An emergency HELLO was generated outside the regular beacon interval.
    #[inline]
    fn router_emergency_hello(&self) {}

    /// A generated message was dropped because the control queue was full.
    #[inline]
    fn router_queue_full(&self) {}

    /// A next-hop query had to fall back to rerouting because the planned
    /// next hop was no longer alive.
    #[inline]
    fn router_reroute_triggered(&self) {}

    /// A destination was declared unreachable and the transport notified.
    #[inline]
    fn router_destination_unreachable(&self) {}

    /// A TDMA slot reservation expired from the slot table.
    #[inline]
    fn tdma_reservation_expired(&self) {}
}
