//! # Integration Flows

pub mod driver_flow;
pub mod relay_flow;
pub mod support;
