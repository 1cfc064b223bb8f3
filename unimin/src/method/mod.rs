pub mod brent;
pub mod derivative_root;
pub mod golden_section;
