//! Domain layer - admission values, errors and policy resolution

pub mod admission;
pub mod errors;
pub mod policy;

pub use admission::*;
pub use errors::*;
pub use policy::*;
