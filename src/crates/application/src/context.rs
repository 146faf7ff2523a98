use crate::event::event_bus::{CorrelationId, EventId};
use domain::value::UserId;

/// 命令执行上下文，串起同一次用户操作产生的事件
#[derive(Debug, Clone)]
pub struct AppContext {
    pub viewer: UserId,
    pub event_id: EventId,
    pub correlation_id: CorrelationId,
    pub causation_id: EventId,
}

impl AppContext {
    pub fn new(viewer: UserId) -> Self {
        let event_id = EventId::new();
        Self {
            viewer,
            event_id: event_id.clone(),
            correlation_id: CorrelationId::new(),
            causation_id: event_id,
        }
    }

    /// 派生子上下文：沿用 correlation_id，以当前事件为因
    pub fn inherit(&self) -> Self {
        Self {
            viewer: self.viewer.clone(),
            event_id: EventId::new(),
            correlation_id: self.correlation_id.clone(),
            causation_id: self.event_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_keeps_correlation() {
        let root = AppContext::new(UserId::from(1));
        let child = root.inherit();
        assert_eq!(child.correlation_id, root.correlation_id);
        assert_eq!(child.causation_id, root.event_id);
        assert_ne!(child.event_id, root.event_id);
    }
}
