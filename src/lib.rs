//! # mpegvid
//!
//! 纯 Rust 实现的 MPEG 系列块编解码核心, 对标 FFmpeg 的 mpegvideo 公共部分.
//!
//! 覆盖 MPEG-1/2, H.261/H.263 族, MPEG-4 Part 2 与 MSMPEG4/WMV 共用的:
//! - **编码上下文**: 帧几何, 宏块表, 生命周期与分辨率变更
//! - **切片并行**: 切片上下文复制, 行范围分配, 状态合并
//! - **扫描表**: zigzag / 交替扫描与 IDCT 系数排列
//! - **反量化**: MPEG-1, MPEG-2 (含失配控制), H.263
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use mpegvid::config::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{ "codec": "mpeg4", "width": 352, "height": 288, "threads": 4 }"#)?;
//! let mut ctx = config.open_context()?;
//! ctx.set_qscale(8);
//! ctx.execute_slices(|slice| {
//!     let (start, end) = slice.row_range();
//!     for mb_y in start..end {
//!         slice.compute_block_indices(0, mb_y)?;
//!     }
//!     Ok(())
//! })?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `mpegvid-core` | 错误类型, 像素格式, 尺寸校验, 可失败分配 |
//! | `mpegvid-codec` | 编码上下文, 切片, 扫描表, 反量化 |

pub mod config;
pub mod logging;

/// 基础类型与工具 (对标 libavutil)
pub use mpegvid_core as core;

/// 块编解码核心 (对标 libavcodec mpegvideo)
pub use mpegvid_codec as codec;

/// 获取 mpegvid 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
