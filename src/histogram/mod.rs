mod model;
mod render;

pub use model::{bar_height, HistogramModel, BAR_WIDTH};
pub use render::{GraphView, Renderer};
