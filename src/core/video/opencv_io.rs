//! OpenCV 文件读写后端（`opencv` feature）

use std::path::Path;

use log::{debug, info, warn};
use opencv::{
    core::{Mat, Scalar, Size, CV_8UC3},
    prelude::*,
    videoio::{
        VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT,
        CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH,
    },
};

use super::error::VideoError;
use super::frame::{ColorFrame, PixelOrder};
use super::stream::{SinkSpec, StreamInfo, VideoSink, VideoSource};

pub struct OpenCvSource {
    capture: VideoCapture,
    info: StreamInfo,
    frames_read: u64,
    released: bool,
}

impl OpenCvSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VideoError> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();
        info!("🎬 Opening input video: {}", path_str);

        let capture = VideoCapture::from_file(&path_str, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(VideoError::NotOpened(path_str.into_owned()));
        }

        // 部分容器不提供帧数，返回 0 或负数
        let frame_count = capture.get(CAP_PROP_FRAME_COUNT)?;
        let info = StreamInfo {
            width: capture.get(CAP_PROP_FRAME_WIDTH)? as u32,
            height: capture.get(CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: capture.get(CAP_PROP_FPS)?,
            frame_count: if frame_count > 0.0 { frame_count as u64 } else { 0 },
        };
        info!(
            "✅ Input opened: {}x{} @ {:.2}fps, {} frames",
            info.width, info.height, info.fps, info.frame_count
        );

        Ok(Self {
            capture,
            info,
            frames_read: 0,
            released: false,
        })
    }
}

impl VideoSource for OpenCvSource {
    fn is_opened(&self) -> bool {
        !self.released && self.capture.is_opened().unwrap_or(false)
    }

    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<ColorFrame>, VideoError> {
        if self.released {
            return Err(VideoError::Released);
        }

        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.rows() == 0 || mat.cols() == 0 {
            debug!("Input exhausted after {} frames", self.frames_read);
            return Ok(None);
        }
        if mat.channels() != 3 {
            return Err(VideoError::UnsupportedFormat(format!(
                "expected 3 channels, got {}",
                mat.channels()
            )));
        }

        let mat = if mat.is_continuous() { mat } else { mat.try_clone()? };
        let frame = ColorFrame::new(
            mat.cols() as u32,
            mat.rows() as u32,
            mat.data_bytes()?.to_vec(),
            PixelOrder::Bgr,
            self.frames_read,
        )?;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.capture.release() {
            warn!("⚠️ Failed to release input capture: {}", e);
        }
        self.released = true;
    }
}

pub struct OpenCvSink {
    writer: VideoWriter,
    spec: SinkSpec,
    released: bool,
}

impl OpenCvSink {
    pub fn open(path: impl AsRef<Path>, spec: &SinkSpec) -> Result<Self, VideoError> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();
        let [c1, c2, c3, c4] = spec.fourcc.0;
        info!(
            "🎞️ Creating output video: {} ({} {}x{} @ {:.2}fps)",
            path_str,
            spec.fourcc.as_string(),
            spec.width,
            spec.height,
            spec.fps
        );

        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;
        let size = Size::new(spec.width as i32, spec.height as i32);
        let writer = VideoWriter::new(&path_str, fourcc, spec.fps, size, true)?;
        if !writer.is_opened()? {
            return Err(VideoError::NotOpened(path_str.into_owned()));
        }

        Ok(Self {
            writer,
            spec: *spec,
            released: false,
        })
    }
}

impl VideoSink for OpenCvSink {
    fn is_opened(&self) -> bool {
        !self.released && self.writer.is_opened().unwrap_or(false)
    }

    fn write_frame(&mut self, frame: &ColorFrame) -> Result<(), VideoError> {
        if self.released {
            return Err(VideoError::Released);
        }
        if frame.order != PixelOrder::Bgr {
            return Err(VideoError::UnsupportedFormat(
                "writer expects BGR frames".to_string(),
            ));
        }
        if frame.dimensions() != (self.spec.width, self.spec.height) {
            return Err(VideoError::UnsupportedFormat(format!(
                "frame {}x{} does not match writer {}x{}",
                frame.width, frame.height, self.spec.width, self.spec.height
            )));
        }

        let mut mat = Mat::new_rows_cols_with_default(
            frame.height as i32,
            frame.width as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(&frame.data);
        self.writer.write(&mat)?;
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.writer.release() {
            warn!("⚠️ Failed to release output writer: {}", e);
        }
        self.released = true;
    }
}

impl Drop for OpenCvSink {
    fn drop(&mut self) {
        self.release();
    }
}
