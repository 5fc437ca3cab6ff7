mod context;
pub use context::{AppContext, StreamConfig};

mod error;
pub use error::ApiError;

mod http;
pub use http::HttpApi;

mod logs;

pub use axum;
