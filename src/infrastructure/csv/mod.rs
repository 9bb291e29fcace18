// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV serialization and read-back

mod csv_parser;
mod csv_writer;

pub use csv_parser::CsvParser;
pub use csv_writer::CsvWriter;
