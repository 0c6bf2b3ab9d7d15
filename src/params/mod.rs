//! Parameter Model (spec C4): metadata for a command's formal parameters,
//! and the two-pass binding algorithm that turns argument text into typed
//! values.

pub mod bind;
pub mod definition;
pub mod tokenize;

pub use bind::bind;
pub use definition::{assign_positions, ParameterDefinition};
