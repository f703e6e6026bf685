pub mod compat;
pub mod size_format;
