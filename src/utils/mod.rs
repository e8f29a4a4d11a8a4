//! Shared helpers for build tree manipulation.

pub mod fs;
