//! HTTP surface: request/response models and the handlers that call the market use cases.

pub mod handlers;
pub mod models;
