//! Chart aggregate: the series sink contract and its reference implementation.

pub mod entities;
pub mod sink;
pub mod value_objects;

pub use entities::*;
pub use sink::*;
pub use value_objects::*;
