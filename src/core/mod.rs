//! Core types shared by every unipak module.

pub mod error;

pub use error::{Result, UnipakError};
