pub mod access;
pub mod aggregate;
pub mod billing;
pub mod config;
pub mod dashboard;
pub mod edit;
pub mod error;
pub mod export;
pub mod http;
pub mod metrics_server;
pub mod observability;
pub mod report;
pub mod request_gen;
pub mod search;
pub mod store;

pub use error::PortalError;
pub use store::{PgReadingStore, ReadingStore};
