use crate::context::AppContext;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 事件信封
#[derive(Debug, Clone)]
pub struct EventEnvelope<T> {
    pub id: EventId,
    pub aggregate_id: i64,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
    // 同一次用户操作产生的事件共享 correlation_id
    pub correlation_id: CorrelationId,
    // 触发本事件的上游事件
    pub causation_id: EventId,
}

impl<T> EventEnvelope<T> {
    pub fn new(
        aggregate_id: i64,
        payload: T,
        correlation_id: CorrelationId,
        causation_id: EventId,
    ) -> Self {
        Self {
            id: EventId::new(),
            aggregate_id,
            timestamp: Utc::now(),
            payload,
            correlation_id,
            causation_id,
        }
    }

    pub fn from_context(aggregate_id: i64, payload: T, ctx: &AppContext) -> Self {
        Self {
            id: ctx.event_id.clone(),
            aggregate_id,
            timestamp: Utc::now(),
            payload,
            correlation_id: ctx.correlation_id.clone(),
            causation_id: ctx.causation_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 强类型 Handler
#[async_trait]
pub trait Handler<E>: Send + Sync {
    async fn handle(&self, event: &EventEnvelope<E>);
}

/// 类型擦除 Handler，用 Any 做事件擦除
#[async_trait]
pub trait ErasedHandler: Send + Sync {
    async fn handle_erased(&self, event: &(dyn Any + Send + Sync));
}

/// 事件总线抽象
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish<E>(&self, event: EventEnvelope<E>) -> Result<(), AppError>
    where
        E: Send + Sync + 'static;

    async fn subscribe<E>(&mut self, handler: Arc<dyn Handler<E>>)
    where
        E: Send + Sync + 'static;
}
