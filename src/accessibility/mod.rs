pub mod extractor;
pub mod node;
pub mod serializer;

pub use extractor::{extract, snapshot_text, TreePayload};
pub use node::AccessibilityNode;
pub use serializer::serialize;
