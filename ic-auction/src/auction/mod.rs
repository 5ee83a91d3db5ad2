pub mod bids;
pub mod clearing;

pub use bids::*;
pub use clearing::*;
