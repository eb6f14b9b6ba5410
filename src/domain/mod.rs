//! Domain types and the two trait seams the plugin sits between.

pub mod amount;
pub mod intent;
pub mod ports;
pub mod session;
