mod timeline;
mod video;

pub use timeline::Timeline;
pub use video::VideoId;
