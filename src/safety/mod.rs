pub mod backup;

pub use backup::{create_backup, format_size};
