//! Raw records for each table stored in an Aqua object.
pub mod material;
pub mod mesh;
pub mod objc;
pub mod strip;
pub mod texture;
pub mod unrm;
pub mod vertex;
