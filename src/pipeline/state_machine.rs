/// 输入流声明的帧数是否可信
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameCountPolicy {
    /// 处理恰好声明数量的帧，提前读空视为错误
    #[default]
    Declared,
    /// 一直读取到流耗尽
    UntilExhausted,
}

impl FrameCountPolicy {
    /// 帧数未知（0）时无法信任声明值
    pub fn resolve(self, declared: u64) -> Self {
        match self {
            FrameCountPolicy::Declared if declared == 0 => FrameCountPolicy::UntilExhausted,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Opening,
    Streaming { frame_index: u64, total: u64 },
    Closed { frames_written: u64 },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    Opened { total: u64 },
    OpenFailed,
    FrameWritten,
    Exhausted,
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineAction {
    ReadNext,
    Finish,
    Abort,
}

impl PipelineState {
    pub fn new() -> Self {
        PipelineState::Opening
    }

    pub fn transition(
        &self,
        event: PipelineEvent,
        policy: FrameCountPolicy,
    ) -> (PipelineState, PipelineAction) {
        match (self, event) {
            (PipelineState::Failed, _) => (PipelineState::Failed, PipelineAction::Abort),
            // 关闭之后不再允许读写
            (PipelineState::Closed { frames_written }, _) => (
                PipelineState::Closed {
                    frames_written: *frames_written,
                },
                PipelineAction::Finish,
            ),
            (_, PipelineEvent::OpenFailed) | (_, PipelineEvent::Fault) => {
                (PipelineState::Failed, PipelineAction::Abort)
            }

            (PipelineState::Opening, PipelineEvent::Opened { total }) => {
                if policy == FrameCountPolicy::Declared && total == 0 {
                    (
                        PipelineState::Closed { frames_written: 0 },
                        PipelineAction::Finish,
                    )
                } else {
                    (
                        PipelineState::Streaming {
                            frame_index: 0,
                            total,
                        },
                        PipelineAction::ReadNext,
                    )
                }
            }
            (PipelineState::Opening, _) => (PipelineState::Failed, PipelineAction::Abort),

            (PipelineState::Streaming { frame_index, total }, PipelineEvent::FrameWritten) => {
                let written = frame_index + 1;
                if policy == FrameCountPolicy::Declared && written >= *total {
                    (
                        PipelineState::Closed {
                            frames_written: written,
                        },
                        PipelineAction::Finish,
                    )
                } else {
                    (
                        PipelineState::Streaming {
                            frame_index: written,
                            total: *total,
                        },
                        PipelineAction::ReadNext,
                    )
                }
            }
            (PipelineState::Streaming { frame_index, .. }, PipelineEvent::Exhausted) => (
                PipelineState::Closed {
                    frames_written: *frame_index,
                },
                PipelineAction::Finish,
            ),
            (PipelineState::Streaming { .. }, PipelineEvent::Opened { .. }) => {
                (PipelineState::Failed, PipelineAction::Abort)
            }
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct StateMachine {
    state: PipelineState,
    policy: FrameCountPolicy,
}

impl StateMachine {
    pub fn new(policy: FrameCountPolicy) -> Self {
        Self {
            state: PipelineState::new(),
            policy,
        }
    }

    pub fn process(&mut self, event: PipelineEvent) -> PipelineAction {
        let (new_state, action) = self.state.transition(event, self.policy);
        self.state = new_state;
        action
    }

    pub fn current_state(&self) -> &PipelineState {
        &self.state
    }

    pub fn policy(&self) -> FrameCountPolicy {
        self.policy
    }

    /// 打开阶段可能根据声明帧数调整策略
    pub fn set_policy(&mut self, policy: FrameCountPolicy) {
        self.policy = policy;
    }

    pub fn frame_index(&self) -> u64 {
        match self.state {
            PipelineState::Streaming { frame_index, .. } => frame_index,
            PipelineState::Closed { frames_written } => frames_written,
            _ => 0,
        }
    }

    pub fn reset(&mut self) {
        self.state = PipelineState::new();
    }
}
