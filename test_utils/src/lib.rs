pub mod fixtures;
pub mod ir;
