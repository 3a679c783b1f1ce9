//! SAM.gov opportunity API: wire types and the paginated search client.

pub mod client;
pub mod models;

pub use client::SamClient;
pub use models::{Award, Opportunity, PlaceOfPerformance, PointOfContact, SearchPage};
