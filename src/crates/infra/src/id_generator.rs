use application::command::shared::IdGenerator;
use application::error::AppError;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const NODE_ID_BITS: i64 = 10;
const SEQUENCE_BITS: i64 = 12;
const MAX_NODE_ID: i64 = (1 << NODE_ID_BITS) - 1;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: i64 = NODE_ID_BITS + SEQUENCE_BITS;
const NODE_ID_SHIFT: i64 = SEQUENCE_BITS;
const EPOCH: i64 = 1704067200000; // 2024-01-01 00:00:00 UTC

#[derive(Debug, Default)]
struct Clock {
    last_timestamp: i64,
    sequence: i64,
}

/// 雪花算法ID生成器，客户端新建实体时在本地生成ID
///
/// 不同设备使用不同的 `node_id`，保证离线生成的ID也不冲突。
pub struct SnowflakeIdGenerator {
    node_id: i64,
    clock: Mutex<Clock>,
}

impl SnowflakeIdGenerator {
    pub fn new(node_id: i64) -> Result<Self, AppError> {
        if !(0..=MAX_NODE_ID).contains(&node_id) {
            return Err(AppError::InvalidInput(format!(
                "node id must be within 0..={}",
                MAX_NODE_ID
            )));
        }
        Ok(Self {
            node_id,
            clock: Mutex::new(Clock::default()),
        })
    }

    fn now_millis() -> Result<i64, AppError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .map_err(|e| AppError::UnknownError(format!("system clock error: {}", e)))
    }

    fn compose(&self, timestamp: i64, sequence: i64) -> i64 {
        ((timestamp - EPOCH) << TIMESTAMP_SHIFT) | (self.node_id << NODE_ID_SHIFT) | sequence
    }
}

#[async_trait]
impl IdGenerator for SnowflakeIdGenerator {
    async fn next_id(&self) -> Result<i64, AppError> {
        let mut clock = self.clock.lock().await;
        let mut timestamp = Self::now_millis()?;
        if timestamp < clock.last_timestamp {
            return Err(AppError::UnknownError(
                "system clock moved backwards".to_string(),
            ));
        }
        if timestamp == clock.last_timestamp {
            clock.sequence = (clock.sequence + 1) & MAX_SEQUENCE;
            if clock.sequence == 0 {
                // 本毫秒序列号用尽
                while timestamp <= clock.last_timestamp {
                    tokio::time::sleep(tokio::time::Duration::from_micros(100)).await;
                    timestamp = Self::now_millis()?;
                }
            }
        } else {
            clock.sequence = 0;
        }
        clock.last_timestamp = timestamp;
        Ok(self.compose(timestamp, clock.sequence))
    }
}
