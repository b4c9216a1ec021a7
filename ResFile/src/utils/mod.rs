//! Utility functions

pub mod path;

pub use path::{extract_base_name, fix_path_separators};
