//! 红色物体隔离器

use std::path::Path;

use log::info;

use crate::core::video::{ColorFrame, MaskFrame};
use crate::pipeline::{FramePipeline, PipelineConfig, PipelineError, RunReport};

/// 未指定输出路径时写入工作目录下的该文件
pub const DEFAULT_OUTPUT: &str = "output.avi";

/// 红色物体隔离器 - HSV 阈值 + 形态学清理，输出原图与掩膜并排的视频
///
/// ```no_run
/// use redmask::api::RedObjectIsolator;
///
/// let mut isolator = RedObjectIsolator::create()?;
/// let report = isolator.isolate_file("red_balloon.avi", "output.avi")?;
/// println!("{} frames", report.frames_written);
/// # Ok::<(), redmask::pipeline::PipelineError>(())
/// ```
pub struct RedObjectIsolator {
    pipeline: FramePipeline,
}

impl RedObjectIsolator {
    pub fn create() -> Result<Self, PipelineError> {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        info!(
            "🎬 RedObjectIsolator: created with {} hue ranges",
            config.mask.ranges.len()
        );
        Ok(Self {
            pipeline: FramePipeline::with_config(config)?,
        })
    }

    /// 对单帧分类，返回清理后的掩膜
    pub fn process_frame(&self, frame: &ColorFrame) -> Result<MaskFrame, PipelineError> {
        Ok(self.pipeline.classifier().classify(frame)?)
    }

    /// 读取输入视频，写出并排对比视频
    #[cfg(feature = "opencv")]
    pub fn isolate_file(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<RunReport, PipelineError> {
        use crate::core::video::{OpenCvSink, OpenCvSource, SinkSpec};
        use crate::pipeline::{LogProgress, StreamRole};

        let mut source = OpenCvSource::open(input.as_ref()).map_err(|e| PipelineError::StreamOpen {
            role: StreamRole::Input,
            reason: e.to_string(),
        })?;
        let output = output.as_ref().to_path_buf();
        let mut opener = move |spec: &SinkSpec| OpenCvSink::open(&output, spec);

        self.pipeline.run(&mut source, &mut opener, &mut LogProgress)
    }

    #[cfg(not(feature = "opencv"))]
    pub fn isolate_file(
        &mut self,
        input: impl AsRef<Path>,
        _output: impl AsRef<Path>,
    ) -> Result<RunReport, PipelineError> {
        Err(PipelineError::StreamOpen {
            role: crate::pipeline::StreamRole::Input,
            reason: format!(
                "cannot decode {}: built without a video backend (enable the `opencv` feature)",
                input.as_ref().display()
            ),
        })
    }
}

impl Drop for RedObjectIsolator {
    fn drop(&mut self) {
        info!("🗑️ RedObjectIsolator: released");
    }
}

pub fn isolate_video(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: PipelineConfig,
) -> Result<RunReport, PipelineError> {
    RedObjectIsolator::with_config(config)?.isolate_file(input, output)
}
