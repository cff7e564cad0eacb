pub mod records;
pub mod scoring;
pub mod shift;
