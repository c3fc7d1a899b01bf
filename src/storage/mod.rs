pub mod checkpoint;
pub mod metadata;
