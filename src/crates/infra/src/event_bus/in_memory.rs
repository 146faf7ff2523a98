use application::error::AppError;
use application::event::event_bus::{ErasedHandler, EventBus, EventEnvelope, Handler};
use application::event::events::DashboardEvent;
use async_trait::async_trait;
use futures::future::join_all;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type HandlerMap = HashMap<TypeId, Vec<Arc<dyn ErasedHandler>>>;

/// 把 Handler<E> 擦除为 ErasedHandler
struct TypedHandler<E> {
    inner: Arc<dyn Handler<E>>,
}

#[async_trait]
impl<E> ErasedHandler for TypedHandler<E>
where
    E: Send + Sync + 'static,
{
    async fn handle_erased(&self, event: &(dyn Any + Send + Sync)) {
        if let Some(envelope) = event.downcast_ref::<EventEnvelope<E>>() {
            self.inner.handle(envelope).await;
        }
    }
}

/// 进程内事件总线，按事件类型分发
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    handlers: Arc<RwLock<HandlerMap>>,
    /// 为 true 时在后台任务里执行处理器，publish 立即返回
    detached: bool,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detached() -> Self {
        Self {
            handlers: Arc::default(),
            detached: true,
        }
    }

    pub async fn handler_count<E: 'static>(&self) -> usize {
        self.handlers
            .read()
            .await
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish<E>(&self, event: EventEnvelope<E>) -> Result<(), AppError>
    where
        E: Send + Sync + 'static,
    {
        let handlers = {
            let guard = self.handlers.read().await;
            match guard.get(&TypeId::of::<E>()) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return Ok(()),
            }
        };
        if self.detached {
            let event = Arc::new(event);
            tokio::spawn(async move {
                join_all(handlers.iter().map(|h| h.handle_erased(event.as_ref()))).await;
            });
        } else {
            join_all(handlers.iter().map(|h| h.handle_erased(&event))).await;
        }
        Ok(())
    }

    async fn subscribe<E>(&mut self, handler: Arc<dyn Handler<E>>)
    where
        E: Send + Sync + 'static,
    {
        let erased: Arc<dyn ErasedHandler> = Arc::new(TypedHandler { inner: handler });
        self.handlers
            .write()
            .await
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }
}

/// 记录收到的仪表盘事件，并写入日志
#[derive(Default)]
pub struct DashboardEventLog {
    events: Mutex<Vec<EventEnvelope<DashboardEvent>>>,
}

impl DashboardEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<DashboardEvent> {
        self.events
            .lock()
            .await
            .iter()
            .map(|e| e.payload.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait]
impl Handler<DashboardEvent> for DashboardEventLog {
    async fn handle(&self, event: &EventEnvelope<DashboardEvent>) {
        log::info!(
            "[Event] {:?} aggregate={} correlation={}",
            event.payload,
            event.aggregate_id,
            event.correlation_id
        );
        self.events.lock().await.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::event::event_bus::{CorrelationId, EventId};
    use domain::value::WorkId;

    fn envelope(work_id: i64) -> EventEnvelope<DashboardEvent> {
        EventEnvelope::new(
            work_id,
            DashboardEvent::WorkCreated {
                work_id: WorkId::from(work_id),
            },
            CorrelationId::new(),
            EventId::new(),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let mut bus = InMemoryEventBus::new();
        let log = Arc::new(DashboardEventLog::new());
        bus.subscribe::<DashboardEvent>(log.clone()).await;
        assert_eq!(bus.handler_count::<DashboardEvent>().await, 1);

        bus.publish(envelope(3)).await.unwrap();
        assert_eq!(
            log.events().await,
            vec![DashboardEvent::WorkCreated {
                work_id: WorkId::from(3)
            }]
        );
    }

    #[tokio::test]
    async fn test_other_event_types_are_ignored() {
        let mut bus = InMemoryEventBus::new();
        let log = Arc::new(DashboardEventLog::new());
        bus.subscribe::<DashboardEvent>(log.clone()).await;
        let other = EventEnvelope::new(1, "ping".to_string(), CorrelationId::new(), EventId::new());
        bus.publish(other).await.unwrap();
        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryEventBus::detached();
        assert!(bus.publish(envelope(1)).await.is_ok());
    }
}
