pub mod error;
pub mod frame;
pub mod memory;
#[cfg(feature = "opencv")]
pub mod opencv_io;
pub mod stream;

pub use error::VideoError;
pub use frame::{ColorFrame, MaskFrame, PixelOrder};
pub use memory::{MemorySink, MemorySource};
#[cfg(feature = "opencv")]
pub use opencv_io::{OpenCvSink, OpenCvSource};
pub use stream::{FourCc, SinkOpener, SinkSpec, StreamInfo, VideoSink, VideoSource};
