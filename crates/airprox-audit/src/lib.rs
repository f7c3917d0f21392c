//! Audit persistence for detected conflicts.
//!
//! The conflict table is written in one pass; per-event audit logs are
//! written by a background task that consumes events from a channel.

pub mod table;
pub mod writer;

pub use table::{
    position_log_csv, write_conflict_table, write_conflict_table_file, CONFLICT_HEADERS,
};
pub use writer::{
    run_audit_writer, spawn_audit_writer, AircraftIndex, AuditConfig, AuditSummary,
};
