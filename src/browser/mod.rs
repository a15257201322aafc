#[cfg(feature = "chrome")]
pub mod chrome;
pub mod navigation;
pub mod session;

#[cfg(feature = "chrome")]
pub use chrome::{ChromeEngine, ChromePage};
pub use navigation::{blocked_reason, ensure_not_blocked};
pub use session::SessionManager;
