#![doc = include_str!("../README.md")]

pub mod config;
mod error;
pub mod vector;

pub use error::Error;
#[cfg(feature = "transients")]
pub use vector::TransientVector;
pub use vector::Vector;
