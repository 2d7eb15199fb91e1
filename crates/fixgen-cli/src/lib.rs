//! Support code for the `fixgen` binary.
//!
//! - [`config`]: flag defaults and registry loading

pub mod config;
