//! Core data types for Fleetbill

pub mod calculation;
pub mod contract;
pub mod ids;
pub mod money;
pub mod trip;
