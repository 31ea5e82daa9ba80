//! Implementations of the [`Metrics`] trait. Currently only the NOOP
//! variant, which disables metrics collection.

use relaymesh::metrics::Metrics;

#[derive(Clone)]
pub struct NoMetrics;
impl Metrics for NoMetrics {}
