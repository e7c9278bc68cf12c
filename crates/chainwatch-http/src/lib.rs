//! chainwatch-http: the HTTP query surface for ChainWatch, built on `axum`.

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::router;
pub use server::serve;
