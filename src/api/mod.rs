pub mod video;

pub use video::{isolate_video, RedObjectIsolator, DEFAULT_OUTPUT};
