//! Event bus adapters.

pub mod sinks;

pub use sinks::{BusStockAlertSink, BusTransitionSink, CENTRAL_STOCK_AGGREGATE_TYPE, ORDER_AGGREGATE_TYPE};
