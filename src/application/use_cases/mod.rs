pub mod cloud_batch;
pub mod crop_ocr;
pub mod quick_process;
pub mod screen_store;
pub mod slip_upload;
pub mod tabular_export;

#[cfg(test)]
pub(crate) mod test_support;
