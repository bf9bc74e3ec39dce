// Attachment acquisition: download, then decrypt or pass through.

pub mod resolver;

pub use resolver::{suggested_file_name, MediaError, MediaResolver, ResolvedMedia};
