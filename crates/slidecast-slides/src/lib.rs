//! # slidecast-slides
//!
//! Everything that turns an uploaded PDF into numbered slide images and
//! addresses those images afterwards.
//!
//! - [`naming`]: `slide-NN.png` names and path-safe session ids
//! - [`library`]: the on-disk layout under the slides and uploads dirs
//! - [`rasterizer`]: the [`Rasterizer`] trait and the `pdftoppm` backend
//! - [`cache`]: the client-side offline cache contract

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod library;
pub mod naming;
pub mod rasterizer;

pub use cache::{MemorySlideCache, SlideCache, is_session_downloaded};
pub use errors::{Result, SlideError};
pub use library::SlideLibrary;
pub use naming::{is_pdf_name, is_valid_session_id, parse_slide_file_name, slide_file_name};
pub use rasterizer::{PdftoppmRasterizer, RasterOutcome, Rasterizer};
