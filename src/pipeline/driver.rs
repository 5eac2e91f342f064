//! 帧处理驱动：读取 → 分类 → 拼接 → 写出，逐帧串行

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::compositor;
use super::error::{PipelineError, StreamRole};
use super::state_machine::{FrameCountPolicy, PipelineAction, PipelineEvent, PipelineState, StateMachine};
use crate::core::mask::{ColorMaskClassifier, MaskConfig};
use crate::core::video::{FourCc, SinkOpener, SinkSpec, StreamInfo, VideoError, VideoSink, VideoSource};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mask: MaskConfig,
    pub fourcc: FourCc,
    pub count_policy: FrameCountPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mask: MaskConfig::default(),
            fourcc: FourCc::MJPG,
            count_policy: FrameCountPolicy::Declared,
        }
    }
}

/// 单帧处理进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameProgress {
    /// 已写出的帧数
    pub written: u64,
    /// 声明的总帧数，按流耗尽处理时为 None
    pub total: Option<u64>,
}

pub trait ProgressObserver {
    fn on_frame(&mut self, progress: FrameProgress);
}

impl<F> ProgressObserver for F
where
    F: FnMut(FrameProgress),
{
    fn on_frame(&mut self, progress: FrameProgress) {
        self(progress)
    }
}

/// 默认进度输出：info 级别日志
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_frame(&mut self, progress: FrameProgress) {
        match progress.total {
            Some(total) => info!("frame {} of {}", progress.written, total),
            None => info!("frame {}", progress.written),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub frames_written: u64,
    pub declared_frames: u64,
    pub output_width: u32,
    pub output_height: u32,
    pub fps: f64,
    pub elapsed: Duration,
}

pub struct FramePipeline {
    classifier: ColorMaskClassifier,
    fourcc: FourCc,
    state_machine: StateMachine,
}

impl FramePipeline {
    pub fn new() -> Result<Self, PipelineError> {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let classifier = ColorMaskClassifier::new(&config.mask)?;
        Ok(Self::with_classifier(classifier, config.fourcc, config.count_policy))
    }

    pub fn with_classifier(classifier: ColorMaskClassifier, fourcc: FourCc, policy: FrameCountPolicy) -> Self {
        Self {
            classifier,
            fourcc,
            state_machine: StateMachine::new(policy),
        }
    }

    pub fn classifier(&self) -> &ColorMaskClassifier {
        &self.classifier
    }

    pub fn state(&self) -> &PipelineState {
        self.state_machine.current_state()
    }

    /// 执行一次完整的转换。任何读写失败都终止整个运行，不重试，也不写出残缺帧。
    pub fn run<S, O>(
        &mut self,
        source: &mut S,
        opener: &mut O,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunReport, PipelineError>
    where
        S: VideoSource,
        O: SinkOpener,
    {
        let started = Instant::now();
        self.state_machine.reset();

        if !source.is_opened() {
            self.state_machine.process(PipelineEvent::OpenFailed);
            error!("❌ Input stream is not opened");
            return Err(PipelineError::StreamOpen {
                role: StreamRole::Input,
                reason: "source is not opened".to_string(),
            });
        }

        // 帧数只在打开时读取一次
        let info = source.info();
        let spec = SinkSpec {
            fourcc: self.fourcc,
            fps: info.fps,
            width: info.width * 2,
            height: info.height,
        };

        let mut sink = match Self::open_sink(opener, &spec) {
            Ok(sink) => sink,
            Err(e) => {
                self.state_machine.process(PipelineEvent::OpenFailed);
                source.release();
                error!("❌ {}", e);
                return Err(e);
            }
        };

        let policy = self.state_machine.policy().resolve(info.frame_count);
        if policy != self.state_machine.policy() {
            warn!("⚠️ Input does not report a frame count, reading until exhausted");
            self.state_machine.set_policy(policy);
        }
        info!(
            "🚀 Streaming {}x{} → {}x{} @ {:.2}fps ({} declared frames)",
            info.width, info.height, spec.width, spec.height, info.fps, info.frame_count
        );

        let result = self.stream(source, &mut sink, &info, observer);
        source.release();
        sink.release();

        match result {
            Ok(frames_written) => {
                let report = RunReport {
                    frames_written,
                    declared_frames: info.frame_count,
                    output_width: spec.width,
                    output_height: spec.height,
                    fps: info.fps,
                    elapsed: started.elapsed(),
                };
                info!(
                    "✅ Wrote {} frames in {:.2}s",
                    report.frames_written,
                    report.elapsed.as_secs_f64()
                );
                Ok(report)
            }
            Err(e) => {
                self.state_machine.process(PipelineEvent::Fault);
                error!("❌ Run aborted: {}", e);
                Err(e)
            }
        }
    }

    fn open_sink<O: SinkOpener>(opener: &mut O, spec: &SinkSpec) -> Result<O::Sink, PipelineError> {
        let sink = opener.open(spec).map_err(|e| PipelineError::StreamOpen {
            role: StreamRole::Output,
            reason: e.to_string(),
        })?;
        if !sink.is_opened() {
            return Err(PipelineError::StreamOpen {
                role: StreamRole::Output,
                reason: "sink is not opened".to_string(),
            });
        }
        Ok(sink)
    }

    fn stream<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        info: &StreamInfo,
        observer: &mut dyn ProgressObserver,
    ) -> Result<u64, PipelineError>
    where
        S: VideoSource,
        K: VideoSink,
    {
        let declared = self.state_machine.policy() == FrameCountPolicy::Declared;
        let total = declared.then_some(info.frame_count);

        let mut action = self.state_machine.process(PipelineEvent::Opened {
            total: info.frame_count,
        });

        while action == PipelineAction::ReadNext {
            let index = self.state_machine.frame_index();
            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) if declared => {
                    return Err(PipelineError::InvalidFrame {
                        index,
                        reason: format!("stream ended before declared frame count {}", info.frame_count),
                    });
                }
                Ok(None) => {
                    action = self.state_machine.process(PipelineEvent::Exhausted);
                    continue;
                }
                Err(VideoError::Released) => return Err(PipelineError::Closed),
                Err(e) => {
                    return Err(PipelineError::InvalidFrame {
                        index,
                        reason: e.to_string(),
                    });
                }
            };

            if frame.is_empty() {
                return Err(PipelineError::InvalidFrame {
                    index,
                    reason: "empty frame".to_string(),
                });
            }
            if frame.dimensions() != info.dimensions() {
                return Err(PipelineError::DimensionMismatch {
                    index,
                    expected: info.dimensions(),
                    actual: frame.dimensions(),
                });
            }

            let mask = self.classifier.classify(&frame)?;
            let canvas = compositor::side_by_side(&frame, &mask)?;
            sink.write_frame(&canvas).map_err(|e| match e {
                VideoError::Released => PipelineError::Closed,
                other => PipelineError::Write {
                    index,
                    reason: other.to_string(),
                },
            })?;

            action = self.state_machine.process(PipelineEvent::FrameWritten);
            debug!("frame {} composited ({:?})", index, action);
            observer.on_frame(FrameProgress {
                written: index + 1,
                total,
            });
        }

        Ok(self.state_machine.frame_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mask::{KernelSpec, RED_LOW};
    use crate::core::video::{ColorFrame, MemorySink, MemorySource, PixelOrder};
    use std::sync::{Arc, Mutex};

    fn gradient_frame(width: u32, height: u32, seed: u8) -> ColorFrame {
        let data = (0..width * height * 3)
            .map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed))
            .collect();
        ColorFrame::new(width, height, data, PixelOrder::Bgr, seed as u64).unwrap()
    }

    /// 返回 sink 写入缓冲的句柄与 opener
    fn memory_opener() -> (
        Arc<Mutex<Option<Arc<Mutex<Vec<ColorFrame>>>>>>,
        impl FnMut(&SinkSpec) -> Result<MemorySink, VideoError>,
    ) {
        let slot = Arc::new(Mutex::new(None));
        let slot_clone = Arc::clone(&slot);
        let opener = move |spec: &SinkSpec| -> Result<MemorySink, VideoError> {
            let sink = MemorySink::new(*spec);
            *slot_clone.lock().unwrap() = Some(sink.frames_handle());
            Ok(sink)
        };
        (slot, opener)
    }

    fn written_frames(slot: &Arc<Mutex<Option<Arc<Mutex<Vec<ColorFrame>>>>>>) -> Vec<ColorFrame> {
        let handle = slot.lock().unwrap().clone().unwrap();
        let frames = handle.lock().unwrap().clone();
        frames
    }

    fn noop_progress() -> impl FnMut(FrameProgress) {
        |_| {}
    }

    #[test]
    fn test_three_frame_run() {
        let inputs: Vec<ColorFrame> = (0..3).map(|i| gradient_frame(4, 3, i)).collect();
        let mut source = MemorySource::new(inputs.clone(), 24.0);
        let (slot, mut opener) = memory_opener();
        let mut pipeline = FramePipeline::new().unwrap();

        let report = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap();

        assert_eq!(report.frames_written, 3);
        assert_eq!((report.output_width, report.output_height), (8, 3));
        assert_eq!(report.fps, 24.0);
        assert_eq!(pipeline.state(), &PipelineState::Closed { frames_written: 3 });
        assert!(source.is_released());

        let outputs = written_frames(&slot);
        assert_eq!(outputs.len(), 3);
        for (input, output) in inputs.iter().zip(&outputs) {
            assert_eq!(output.dimensions(), (8, 3));
            for y in 0..3 {
                for x in 0..4 {
                    assert_eq!(output.pixel(x, y), input.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn test_right_half_is_mask() {
        let mut frame = ColorFrame::filled(4, 3, [0, 255, 0], PixelOrder::Bgr);
        frame.set_pixel(2, 1, [0, 0, 255]);
        let mut source = MemorySource::new(vec![frame], 30.0);
        let (slot, mut opener) = memory_opener();

        let config = PipelineConfig {
            mask: MaskConfig {
                ranges: vec![RED_LOW],
                kernel: KernelSpec::rect(1, 1),
                ..MaskConfig::default()
            },
            ..PipelineConfig::default()
        };
        let mut pipeline = FramePipeline::with_config(config).unwrap();
        pipeline.run(&mut source, &mut opener, &mut noop_progress()).unwrap();

        let output = &written_frames(&slot)[0];
        assert_eq!(output.pixel(4 + 2, 1), [255, 255, 255]);
        assert_eq!(output.pixel(4, 0), [0, 0, 0]);
        assert_eq!(output.pixel(2, 1), [0, 0, 255]);
    }

    #[test]
    fn test_progress_reported_per_frame() {
        let inputs: Vec<ColorFrame> = (0..4).map(|i| gradient_frame(2, 2, i)).collect();
        let mut source = MemorySource::new(inputs, 30.0);
        let (_slot, mut opener) = memory_opener();
        let mut seen = Vec::new();

        let mut pipeline = FramePipeline::new().unwrap();
        pipeline
            .run(&mut source, &mut opener, &mut |p: FrameProgress| seen.push(p))
            .unwrap();

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], FrameProgress { written: 1, total: Some(4) });
        assert_eq!(seen[3], FrameProgress { written: 4, total: Some(4) });
    }

    #[test]
    fn test_short_stream_fails_explicitly() {
        let inputs: Vec<ColorFrame> = (0..2).map(|i| gradient_frame(4, 3, i)).collect();
        let info = StreamInfo {
            width: 4,
            height: 3,
            fps: 30.0,
            frame_count: 5,
        };
        let mut source = MemorySource::with_info(inputs, info);
        let (slot, mut opener) = memory_opener();
        let mut pipeline = FramePipeline::new().unwrap();

        let err = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidFrame { index: 2, .. }));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(pipeline.state(), &PipelineState::Failed);
        // 已写出的帧保留，不回滚
        assert_eq!(written_frames(&slot).len(), 2);
    }

    #[test]
    fn test_until_exhausted_policy() {
        let inputs: Vec<ColorFrame> = (0..3).map(|i| gradient_frame(4, 3, i)).collect();
        let info = StreamInfo {
            width: 4,
            height: 3,
            fps: 30.0,
            frame_count: 0,
        };
        let mut source = MemorySource::with_info(inputs, info);
        let (slot, mut opener) = memory_opener();
        let mut pipeline = FramePipeline::new().unwrap();

        let report = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap();

        assert_eq!(report.frames_written, 3);
        assert_eq!(report.declared_frames, 0);
        assert_eq!(written_frames(&slot).len(), 3);
    }

    #[test]
    fn test_declared_count_limits_reads() {
        let inputs: Vec<ColorFrame> = (0..5).map(|i| gradient_frame(4, 3, i)).collect();
        let info = StreamInfo {
            width: 4,
            height: 3,
            fps: 30.0,
            frame_count: 2,
        };
        let mut source = MemorySource::with_info(inputs, info);
        let (slot, mut opener) = memory_opener();
        let mut pipeline = FramePipeline::new().unwrap();

        let report = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap();
        assert_eq!(report.frames_written, 2);
        assert_eq!(written_frames(&slot).len(), 2);
    }

    #[test]
    fn test_dimension_mismatch() {
        let inputs = vec![gradient_frame(4, 3, 0), gradient_frame(5, 3, 1)];
        let info = StreamInfo {
            width: 4,
            height: 3,
            fps: 30.0,
            frame_count: 2,
        };
        let mut source = MemorySource::with_info(inputs, info);
        let (_slot, mut opener) = memory_opener();
        let mut pipeline = FramePipeline::new().unwrap();

        let err = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                index: 1,
                expected: (4, 3),
                actual: (5, 3)
            }
        ));
    }

    #[test]
    fn test_input_not_opened() {
        let mut source = MemorySource::new(Vec::new(), 30.0);
        let (slot, mut opener) = memory_opener();
        let mut pipeline = FramePipeline::new().unwrap();

        let err = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StreamOpen {
                role: StreamRole::Input,
                ..
            }
        ));
        assert_eq!(pipeline.state(), &PipelineState::Failed);
        // 输入失败时不会尝试打开输出
        assert!(slot.lock().unwrap().is_none());
    }

    #[test]
    fn test_output_open_failure() {
        let mut source = MemorySource::new(vec![gradient_frame(4, 3, 0)], 30.0);
        let mut opener = |_: &SinkSpec| -> Result<MemorySink, VideoError> {
            Err(VideoError::NotOpened("out.avi".to_string()))
        };
        let mut pipeline = FramePipeline::new().unwrap();

        let err = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StreamOpen {
                role: StreamRole::Output,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 3);
        assert!(source.is_released());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_write_failure_is_terminal() {
        let inputs: Vec<ColorFrame> = (0..3).map(|i| gradient_frame(4, 3, i)).collect();
        let mut source = MemorySource::new(inputs, 30.0);
        let mut opener = |spec: &SinkSpec| -> Result<MemorySink, VideoError> {
            Ok(MemorySink::failing_after(*spec, 1))
        };
        let mut pipeline = FramePipeline::new().unwrap();

        let err = pipeline
            .run(&mut source, &mut opener, &mut noop_progress())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Write { index: 1, .. }));
        assert_eq!(pipeline.state(), &PipelineState::Failed);
    }

    #[test]
    fn test_sink_spec_doubles_width() {
        let mut source = MemorySource::new(vec![gradient_frame(4, 3, 0)], 12.5);
        let specs = Arc::new(Mutex::new(Vec::new()));
        let specs_clone = Arc::clone(&specs);
        let mut opener = move |spec: &SinkSpec| -> Result<MemorySink, VideoError> {
            specs_clone.lock().unwrap().push(*spec);
            Ok(MemorySink::new(*spec))
        };
        let mut pipeline = FramePipeline::new().unwrap();
        pipeline.run(&mut source, &mut opener, &mut noop_progress()).unwrap();

        let spec = specs.lock().unwrap()[0];
        assert_eq!(spec.fourcc, FourCc::MJPG);
        assert_eq!((spec.width, spec.height), (8, 3));
        assert_eq!(spec.fps, 12.5);
    }

    #[test]
    fn test_empty_range_config_rejected() {
        let config = PipelineConfig {
            mask: MaskConfig::with_ranges(Vec::new()),
            ..PipelineConfig::default()
        };
        let err = FramePipeline::with_config(config).err().unwrap();
        assert_eq!(err.exit_code(), 6);
    }
}
