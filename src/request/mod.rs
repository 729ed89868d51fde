pub mod client;
pub mod errors;
pub mod template;
pub mod types;

pub use client::send;
pub use errors::RequestError;
pub use template::{RequestTemplate, substitute};
pub use types::{CallOverrides, JsonPayload, PreparedRequest, RequestBody};
