pub mod removeclipping;
pub mod stats;
