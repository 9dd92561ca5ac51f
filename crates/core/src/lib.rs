pub mod layout;
pub mod namespace;
pub mod quota;
pub mod retention;

pub use layout::DataLayout;
pub use namespace::Namespace;
pub use quota::{DAILY_QUOTA, FixedWindow, QUOTA_WINDOW_MS, QuotaStatus, fixed_window, quota_window};
pub use retention::RetentionPolicy;
