//! Transformation module.
//!
//! - `lookup`: Fixed code-to-label tables
//! - `dimensions`: Dimension table builders
//! - `fact`: Position-equivalence join and fact table
//! - `star`: The dimensional transformer
//! - `pipeline`: CSV to star schema pipeline

pub mod dimensions;
pub mod fact;
pub mod lookup;
pub mod pipeline;
pub mod star;

pub use lookup::{CodeLookup, PAYMENT_TYPE_LABELS, RATE_CODE_LABELS};
pub use pipeline::*;
pub use star::{prepare_trips, transform_trips};
