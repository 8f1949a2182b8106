mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use geometry::draw_line;
pub use projection::Viewport;
pub use renderer::{DisplaySettings, Lod, MapLayers, MapRenderer, SHADES};
