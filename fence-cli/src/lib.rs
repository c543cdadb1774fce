//! # Fence CLI Library
//!
//! The apply state machine, report rendering and command handlers behind the
//! `fence` binary.

pub mod apply;
pub mod cli;
pub mod clients;
pub mod consts;
pub mod render;
