//! 内存中的视频流，用于测试与嵌入式调用

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::error::VideoError;
use super::frame::ColorFrame;
use super::stream::{SinkSpec, StreamInfo, VideoSink, VideoSource};

pub struct MemorySource {
    frames: VecDeque<ColorFrame>,
    info: StreamInfo,
    released: bool,
}

impl MemorySource {
    /// 由帧序列构造，尺寸取第一帧，声明帧数即序列长度
    pub fn new(frames: Vec<ColorFrame>, fps: f64) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let info = StreamInfo {
            width,
            height,
            fps,
            frame_count: frames.len() as u64,
        };
        Self::with_info(frames, info)
    }

    /// 显式指定元数据，可模拟声明帧数与实际不符的流
    pub fn with_info(frames: Vec<ColorFrame>, info: StreamInfo) -> Self {
        Self {
            frames: frames.into(),
            info,
            released: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl VideoSource for MemorySource {
    fn is_opened(&self) -> bool {
        !self.released && self.info.width > 0 && self.info.height > 0
    }

    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<ColorFrame>, VideoError> {
        if self.released {
            return Err(VideoError::Released);
        }
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }
}

/// 写入的帧保存在共享缓冲中，sink 被驱动消费后仍可通过句柄读取
pub struct MemorySink {
    spec: SinkSpec,
    frames: Arc<Mutex<Vec<ColorFrame>>>,
    fail_after: Option<usize>,
    released: bool,
}

impl MemorySink {
    pub fn new(spec: SinkSpec) -> Self {
        Self {
            spec,
            frames: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
            released: false,
        }
    }

    /// 写入 `count` 帧之后的写操作全部失败
    pub fn failing_after(spec: SinkSpec, count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::new(spec)
        }
    }

    pub fn spec(&self) -> &SinkSpec {
        &self.spec
    }

    pub fn frames_handle(&self) -> Arc<Mutex<Vec<ColorFrame>>> {
        Arc::clone(&self.frames)
    }
}

impl VideoSink for MemorySink {
    fn is_opened(&self) -> bool {
        !self.released
    }

    fn write_frame(&mut self, frame: &ColorFrame) -> Result<(), VideoError> {
        if self.released {
            return Err(VideoError::Released);
        }
        if frame.dimensions() != (self.spec.width, self.spec.height) {
            return Err(VideoError::UnsupportedFormat(format!(
                "frame {}x{} does not match sink {}x{}",
                frame.width, frame.height, self.spec.width, self.spec.height
            )));
        }

        let mut frames = self
            .frames
            .lock()
            .map_err(|_| VideoError::Backend("frame buffer poisoned".to_string()))?;
        if let Some(limit) = self.fail_after {
            if frames.len() >= limit {
                return Err(VideoError::Backend(format!("write refused after {} frames", limit)));
            }
        }
        frames.push(frame.clone());
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}
