//! Outbound reply model and the transport port that delivers it.

pub mod port;
pub mod types;
