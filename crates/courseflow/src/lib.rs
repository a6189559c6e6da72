//! Rule core for coursework submission handling: when a student may submit,
//! whether an existing submission may be edited, and how payment-gated late
//! submissions unlock. Everything that persists or charges money lives
//! behind collaborator traits; this crate never second-guesses those
//! collaborators, it only coordinates them.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
