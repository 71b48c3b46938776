//! Clients for external services: the STAC catalog search API and the
//! TiTiler raster statistics/tile service

pub mod stac;
pub mod titiler;

pub use stac::StacClient;
pub use titiler::TitilerClient;
