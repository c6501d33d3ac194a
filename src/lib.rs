//! Visual attribute extraction and matching for scraped fashion catalogs.
//!
//! Three stages turn raw product photos into recommendations:
//!
//! 1. [`selector`] picks one representative model photo per product, using
//!    [`pose`] to classify body coverage and orientation from the landmarks a
//!    [`landmarks::LandmarkOracle`] reports.
//! 2. [`skin`] extracts the dominant skin tone of that photo, persisted in the
//!    text form defined by [`color`].
//! 3. [`recommend`] ranks a gender-filtered catalog by color distance to a
//!    user's own skin tone.
//!
//! [`pipeline`] runs stages 1 and 2 over a whole [`catalog`] concurrently.

pub mod args;
pub mod catalog;
pub mod color;
pub mod config;
pub mod error;
pub mod fetch;
pub mod inference;
pub mod landmarks;
pub mod pipeline;
pub mod pose;
pub mod recommend;
pub mod selector;
pub mod skin;
pub mod types;

pub use color::{SkinTone, ToneCell};
pub use error::{CatalogError, FetchError, NoRecommendation, ParseToneError};
pub use types::{Coverage, Landmark, PoseClassification, ProductRecord, RecommendationResult};
