mod color;
mod html;
mod layer;

pub use color::*;
pub use html::write_map_html;
pub use layer::*;
