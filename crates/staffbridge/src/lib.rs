//! Staffbridge core: the decision engine behind the staffing-marketplace
//! agreement lifecycle.
//!
//! The crate owns the pure logic only: who may act next on an agreement,
//! which fee obligations gate a signature, what a withdrawal costs, and how a
//! booking conflict is surfaced. The authoritative state transitions live
//! behind the [`workflows::agreements::AgreementAuthority`] boundary; this
//! crate interprets snapshots and decides which command is legal to send.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
