pub mod backend;
pub mod config;
pub mod csv;
pub mod download;
pub mod logging;
pub mod storage;
