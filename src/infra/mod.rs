pub mod config;
pub mod csv_reader;
pub mod db;
pub mod ingest;
pub mod utils;
