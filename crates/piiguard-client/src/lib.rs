pub mod error;
pub mod http;
pub mod service;

pub use error::ServiceError;
pub use http::{ClientOptions, Endpoints, HttpAnalysisService};
pub use service::{AnalysisService, RedactedImage};
