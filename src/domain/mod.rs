pub mod csv;
pub mod error;
pub mod extraction;
pub mod ocr_api;
pub mod screen;
pub mod upload;
