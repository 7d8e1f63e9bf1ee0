//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Collections and deferred mutation buffers
//! - Time management
//! - Delayed results
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod time;
pub mod delayed;
pub mod logging;
