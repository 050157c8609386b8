pub mod map;
pub mod templates;
