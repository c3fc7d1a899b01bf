pub mod dictionary;
pub mod inverted;
pub mod point;
pub mod spatial;
