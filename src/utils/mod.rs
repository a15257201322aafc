pub mod javascript;
pub mod urls;

pub use urls::{cache_key, normalize_url, HotUrls};
