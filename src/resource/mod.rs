//! Reusable stale-while-revalidate resource layer.
//!
//! Pages describe a resource as a cache key, a polling policy and a fetcher;
//! [`ResourceBinding`] turns that into "paint from cache, then refresh
//! silently" with scoped timer cleanup.

mod binding;
mod error;
mod fetcher;
mod scheduler;

pub use binding::{BindingState, ResourceBinding};
pub use error::FetchError;
pub use fetcher::{EndpointFetcher, Method, Section, SectionSource};
pub use scheduler::ResourcePolicy;
