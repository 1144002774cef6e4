//! Scan pipeline: discovery -> enumeration -> measurement, one cycle per metrics request.

pub mod discovery;
pub mod enumeration;
pub mod measurement;
pub mod patterns;
pub mod scanner;

pub use discovery::{discover_databases, parse_keyspace};
pub use enumeration::enumerate_keys;
pub use measurement::measure_lengths;
pub use patterns::KeyPatternSet;
pub use scanner::{ScanFailure, ScanReport, Scanner};
