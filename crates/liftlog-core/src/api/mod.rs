//! Application wiring.

mod builder;

pub use builder::LiftlogBuilder;
