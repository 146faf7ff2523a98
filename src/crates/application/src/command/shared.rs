use crate::error::AppError;

/// 客户端新建实体（Work、歌单、条目、评论等）时使用的 ID 生成器
#[async_trait::async_trait]
pub trait IdGenerator: Send + Sync {
    /// 生成下一个唯一ID
    async fn next_id(&self) -> Result<i64, AppError>;
}
