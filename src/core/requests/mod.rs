pub mod request_builder;
pub mod request_models;

pub use request_builder::{InsertionStrategy, RequestBuilder};
pub use request_models::Request;
