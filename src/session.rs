//! Sessions handed to mod_auth_memcookie: the identifier in the cookie, the record in memcached,
//! and the hooks that tear both down again on logout.

pub mod id;
pub mod lifecycle;
pub mod logout;
pub mod record;

pub use id::SessionId;
pub use lifecycle::{LogoutHandler, SessionLifecycle};
pub use logout::CacheCleanup;
pub use record::SessionRecord;
