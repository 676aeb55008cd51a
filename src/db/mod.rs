//! Storage module for availgraph.
//!
//! The JSON configuration store and the rrdtool time-series file.

mod models;
mod names;
mod rrd;
mod store;

pub use models::*;
pub use names::*;
pub use rrd::*;
pub use store::*;
