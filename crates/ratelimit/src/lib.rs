pub mod error;
pub mod limiter;
pub mod local;
pub mod remote;

pub use error::RateLimitError;
pub use limiter::RateLimiter;
pub use local::LocalRateLimiter;
pub use remote::RemoteRateLimiter;
