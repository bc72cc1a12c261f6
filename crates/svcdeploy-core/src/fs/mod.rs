//! Filesystem primitives: staging, recursive copy/delete, content hashing.

pub mod stage;
pub mod tree;
pub mod tree_hash;

pub use stage::{DirectoryStager, StageReport};
pub use tree::{LocalTree, TreeOps, is_locked_resource_error, remove_path_if_exists};
pub use tree_hash::{hash_file, hash_tree, trees_match};
