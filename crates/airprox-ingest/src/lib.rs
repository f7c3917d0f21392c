//! Record store for the conflict pipeline.
//!
//! Turns ARIA surveillance logs into the flat record table and reads or
//! writes that table as CSV.

pub mod aria;
pub mod error;
pub mod table;

pub use aria::{parse_aria_line, parse_aria_log, AriaOptions, AriaParse};
pub use error::IngestError;
pub use table::{
    parse_timestamp, read_record_table, read_record_table_file, write_record_table,
    write_record_table_file, RecordTable, RECORD_HEADERS,
};
