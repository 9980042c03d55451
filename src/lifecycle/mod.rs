//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to the server
//!   and the eviction sweeper
//! - In-flight requests drain before the process exits

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
