use thiserror::Error;

/// 事件处理中无法恢复的错误，整个事件的变更都不会写入
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("交易对不存在: {0}")]
    MissingPool(String),
    #[error("代币不存在: {0}")]
    MissingToken(String),
    #[error("无法获取代币精度: {0}")]
    UnresolvedDecimals(String),
}
