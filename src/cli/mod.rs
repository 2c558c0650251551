//! CLI command implementations.
//!
//! The binary is a thin shell over [`RotateCommand`]: it reads backup names
//! from stdin, one per line, and writes either the names to keep or the names
//! to delete to stdout.
//!
//! # Example Usage
//!
//! ```bash
//! # Delete everything the log2 schedule does not need
//! ls /backups | log2rotate --delete --format 'db-%Y-%m-%d.sql.gz' | xargs -r rm
//!
//! # Keep the 7 newest unconditionally, tolerate a missed night
//! ls /backups | log2rotate --keep --skip 7 --fuzz 1
//! ```

mod rotate;

pub use rotate::{OutputFormat, RotateCommand, read_names};
