//! Data transfer objects (DTOs) for API responses.
//!
//! These structs are serialized to JSON for the page's consumption.
//! - `session`: SessionView, Phase, Notice, ArchiveInfo
//! - `request`: FetchBranchesRequest, SelectionRequest

pub mod request;
pub mod session;

pub use request::*;
pub use session::*;
