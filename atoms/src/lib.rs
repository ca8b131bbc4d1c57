pub mod blobs;
pub mod error;
pub mod images;
pub mod store;
pub mod thumbs;

pub use error::{GalleryError, GalleryResult};
