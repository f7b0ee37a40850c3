//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: drops expired candidate entries at the configured interval

mod cleanup;

pub use cleanup::spawn_sweep_task;
