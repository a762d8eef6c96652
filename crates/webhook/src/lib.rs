pub mod executor;
pub mod request;
pub mod response;
pub mod retry;

pub use executor::{execute, WebhookOutcome};
pub use request::{HttpMethod, PreparedRequest, WebhookSpec};
pub use retry::RetryPolicy;
