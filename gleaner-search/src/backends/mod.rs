//! Concrete search backend implementations.

mod api;
mod description;
mod scrape;

pub use api::ApiBackend;
pub use description::DescriptionBackend;
pub use scrape::ScrapeBackend;
