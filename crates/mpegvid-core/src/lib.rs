//! # mpegvid-core
//!
//! mpegvid 核心库, 提供错误类型、像素格式描述、图像尺寸校验和可失败的表分配.
//!
//! 本 crate 对标 FFmpeg 的 libavutil 中被块编码核心依赖的部分.

pub mod error;
pub mod imgutils;
pub mod mem;
pub mod pixel_format;

// 重导出常用类型
pub use error::{MpvError, MpvResult};
pub use mem::AllocLimit;
pub use pixel_format::PixelFormat;
