// src/lib.rs

pub mod analysis;
pub mod config;
pub mod error;
pub mod grid;
pub mod output;
pub mod permittivity;
pub mod simulator;
pub mod source;
pub mod visualisation;

pub use error::{OutputError, SimError};
pub use permittivity::Permittivity;
pub use simulator::{FieldSimulator, ProbeSample, SnapshotSample};
pub use source::Source;
