/// 仪表盘运行参数，由基础设施层的配置实现
pub trait DashboardConfig: Send + Sync {
    /// 当前登录用户
    fn viewer_id(&self) -> i64;

    /// 成功提示自动消失的时间（毫秒）
    fn success_notice_ttl_ms(&self) -> u64;

    /// 播放结束后是否自动播放下一首
    fn auto_advance(&self) -> bool;

    /// 自定义 URL scheme，如 "coretet"
    fn deep_link_scheme(&self) -> String;

    /// 网页分享链接使用的域名
    fn web_host(&self) -> String;
}
