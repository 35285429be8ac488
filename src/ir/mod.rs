pub mod forms;
pub mod inert;
pub mod reader;
pub mod symbol_resolution;
pub mod syntax;
