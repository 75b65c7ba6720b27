//! Infrastructure layer implementing the domain repository traits.
//!
//! - [`persistence`] - Repository implementations

pub mod persistence;
