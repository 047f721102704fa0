pub mod conversion_models;
pub mod conversion_service;

pub use conversion_models::{DocumentHandle, DEFAULT_TITLE};
pub use conversion_service::{ConversionService, DocsApiError, DocumentsApi};
