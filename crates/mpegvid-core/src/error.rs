//! 统一错误类型定义.
//!
//! 编码上下文的初始化、切片复制与宏块索引计算共用的错误类型.

use thiserror::Error;

/// mpegvid 统一错误类型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MpvError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 帧几何参数无效 (尺寸为 0、超限, 或像素格式未设置)
    #[error("无效几何参数: {0}")]
    InvalidGeometry(String),

    /// 访问的表在当前配置下未分配
    #[error("表未分配: {0}")]
    MissingTable(String),

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 场图像的宏块行奇偶与场极性不一致 (调用方逻辑错误)
    #[error("场极性不一致: mb_y={mb_y}, 底场={bottom_field}")]
    InconsistentFieldParity {
        /// 出错的宏块行
        mb_y: usize,
        /// 当前图像是否为底场
        bottom_field: bool,
    },

    /// 上下文尚未初始化
    #[error("编码上下文尚未初始化")]
    NotInitialized,
}

/// mpegvid 统一 Result 类型
pub type MpvResult<T> = Result<T, MpvError>;
