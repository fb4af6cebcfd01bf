pub mod backend;
pub mod model;
pub mod palette;
pub mod render;
