pub mod summary;
pub mod validate;
