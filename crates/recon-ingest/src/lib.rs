pub mod csv_table;
pub mod error;

pub use csv_table::{read_table, read_table_from_reader};
pub use error::IngestError;
