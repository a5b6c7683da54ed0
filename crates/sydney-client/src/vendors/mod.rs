//! Backend-specific protocol handling.
//!
//! Only Sydney has an interpreter; other `BackendKind`s are rejected at
//! dispatch.
pub mod sydney;
