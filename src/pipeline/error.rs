use std::fmt;

use thiserror::Error;

use crate::core::mask::MaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Input,
    Output,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRole::Input => write!(f, "input"),
            StreamRole::Output => write!(f, "output"),
        }
    }
}

/// 运行期错误，全部为致命错误：不重试，已打开的输出文件保留原样
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("Unable to open {role} stream: {reason}")]
    StreamOpen { role: StreamRole, reason: String },
    #[error("Invalid frame {index}: {reason}")]
    InvalidFrame { index: u64, reason: String },
    #[error("Frame {index} is {}x{}, expected {}x{}", .actual.0, .actual.1, .expected.0, .expected.1)]
    DimensionMismatch {
        index: u64,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Classifier error: {0}")]
    Classifier(#[from] MaskError),
    #[error("Failed to write frame {index}: {reason}")]
    Write { index: u64, reason: String },
    #[error("Stream already closed")]
    Closed,
}

impl PipelineError {
    /// 每类错误对应独立的进程退出码
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::MissingArgument(_) => 2,
            PipelineError::StreamOpen { .. } => 3,
            PipelineError::InvalidFrame { .. } => 4,
            PipelineError::DimensionMismatch { .. } => 5,
            PipelineError::Classifier(_) => 6,
            PipelineError::Write { .. } => 7,
            PipelineError::Closed => 8,
        }
    }
}
