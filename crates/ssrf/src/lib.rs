pub mod classify;
pub mod guard;

pub use classify::is_blocked_ip;
pub use guard::{PinnedResolver, SsrfError, SsrfGuard};
