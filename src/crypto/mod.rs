pub mod hashing;

pub use hashing::hash_document;
