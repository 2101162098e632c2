#![forbid(unsafe_code)]

//! Core types for the Sigtuna XML canonicalization library.
//!
//! Contains the shared [`Error`] type and the W3C namespace / algorithm
//! URI constants used across the workspace.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
