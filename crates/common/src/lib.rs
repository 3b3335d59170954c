//! Error plumbing shared by the chanstat crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
