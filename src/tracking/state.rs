// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 轨迹生命周期状态机
//! Track lifecycle: READY → RUNNING ⇄ LOST → READY

/// 槽位状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TrackState {
    /// 空闲槽位
    #[default]
    Ready,

    /// 正在跟踪, 还需 `confirmations_left` 次匹配才算确认
    Running { confirmations_left: u8 },

    /// 丢失, 再连续 `ticks_left` 个检测周期未匹配就释放
    Lost { ticks_left: u8 },
}

impl TrackState {
    /// 新建或重启
    pub fn spawn(confirmations: u8) -> Self {
        TrackState::Running {
            confirmations_left: confirmations,
        }
    }

    /// 检测周期内被匹配
    pub fn on_match(self, confirmations: u8) -> Self {
        match self {
            TrackState::Running { confirmations_left } => TrackState::Running {
                confirmations_left: confirmations_left.saturating_sub(1),
            },
            // LOST 重新匹配时会重启滤波器
            TrackState::Lost { .. } => TrackState::spawn(confirmations),
            TrackState::Ready => TrackState::Ready,
        }
    }

    /// 在检测框处重启: RUNNING 视为一次匹配 (已确认的轨迹保持确认), 其余重新计数
    pub fn on_restart(self, confirmations: u8) -> Self {
        match self {
            TrackState::Running { .. } => self.on_match(confirmations),
            _ => TrackState::spawn(confirmations),
        }
    }

    /// 检测周期内未被匹配; 连续 `lost_substates` 次后回到 READY
    pub fn on_miss(self, lost_substates: u8) -> Self {
        match self {
            TrackState::Running { .. } => {
                if lost_substates <= 1 {
                    TrackState::Ready
                } else {
                    TrackState::Lost {
                        ticks_left: lost_substates - 1,
                    }
                }
            }
            TrackState::Lost { ticks_left } => {
                if ticks_left <= 1 {
                    TrackState::Ready
                } else {
                    TrackState::Lost {
                        ticks_left: ticks_left - 1,
                    }
                }
            }
            TrackState::Ready => TrackState::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TrackState::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TrackState::Running { .. })
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, TrackState::Lost { .. })
    }

    /// RUNNING 或 LOST
    pub fn is_active(&self) -> bool {
        !self.is_ready()
    }

    /// 已确认的 RUNNING 轨迹才会对外输出
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self,
            TrackState::Running {
                confirmations_left: 0
            }
        )
    }

    /// 显示用的简短标签
    pub fn label(&self) -> &'static str {
        match self {
            TrackState::Ready => "READY",
            TrackState::Running { .. } => "RUN",
            TrackState::Lost { .. } => "LOST",
        }
    }
}
