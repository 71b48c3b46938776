//! Business logic services

pub mod crop;
pub mod field;
pub mod ingest;
pub mod ndvi;
pub mod scene;

pub use crop::CropService;
pub use field::FieldService;
pub use ingest::IngestService;
pub use ndvi::NdviService;
