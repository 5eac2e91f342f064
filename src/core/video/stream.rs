//! 视频读写抽象：解码端 `VideoSource` 与编码端 `VideoSink`

use super::error::VideoError;
use super::frame::ColorFrame;

/// 打开输入流后读取的元数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// 流声明的总帧数，0 表示未知
    pub frame_count: u64,
}

impl StreamInfo {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// 四字符编码标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCc(pub [char; 4]);

impl FourCc {
    /// Motion-JPEG，写入 AVI 容器
    pub const MJPG: FourCc = FourCc(['M', 'J', 'P', 'G']);

    pub fn as_string(&self) -> String {
        self.0.iter().collect()
    }
}

/// 编码端参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSpec {
    pub fourcc: FourCc,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

pub trait VideoSource {
    fn is_opened(&self) -> bool;

    fn info(&self) -> StreamInfo;

    /// 读取下一帧，流耗尽时返回 `Ok(None)`
    fn read_frame(&mut self) -> Result<Option<ColorFrame>, VideoError>;

    /// 释放底层资源，可重复调用
    fn release(&mut self);
}

pub trait VideoSink {
    fn is_opened(&self) -> bool;

    fn write_frame(&mut self, frame: &ColorFrame) -> Result<(), VideoError>;

    fn release(&mut self);
}

/// 按参数打开编码端。输出尺寸由驱动在读取输入元数据后才确定，所以延迟到此处打开。
pub trait SinkOpener {
    type Sink: VideoSink;

    fn open(&mut self, spec: &SinkSpec) -> Result<Self::Sink, VideoError>;
}

impl<F, S> SinkOpener for F
where
    F: FnMut(&SinkSpec) -> Result<S, VideoError>,
    S: VideoSink,
{
    type Sink = S;

    fn open(&mut self, spec: &SinkSpec) -> Result<S, VideoError> {
        self(spec)
    }
}
