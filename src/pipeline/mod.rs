//! 视频处理驱动
//!
//! 状态机：Opening → Streaming → Closed，打开失败进入 Failed。
//! 每帧完整经过 读取 → 分类 → 拼接 → 写出 后才读取下一帧。

pub mod compositor;
pub mod driver;
pub mod error;
pub mod state_machine;

pub use compositor::side_by_side;
pub use driver::{FrameProgress, FramePipeline, LogProgress, PipelineConfig, ProgressObserver, RunReport};
pub use error::{PipelineError, StreamRole};
pub use state_machine::{FrameCountPolicy, PipelineAction, PipelineEvent, PipelineState, StateMachine};
