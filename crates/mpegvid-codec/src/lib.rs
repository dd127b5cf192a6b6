//! # mpegvid-codec
//!
//! MPEG-1/2, H.263 族, MPEG-4 Part 2 与 MSMPEG4/WMV 共享的块编解码核心.
//!
//! 本 crate 对标 FFmpeg libavcodec 的 mpegvideo 公共部分, 只负责编码上下文的
//! 生命周期、切片上下文复制、宏块索引、扫描表与反量化; 熵编解码、运动补偿与
//! IDCT 由上层实现.
//!
//! ## 使用示例
//!
//! ```rust
//! use mpegvid_codec::{CodecId, ContextOptions, MpegVideoContext, Threading};
//! use mpegvid_core::PixelFormat;
//!
//! let mut ctx = MpegVideoContext::new(ContextOptions::decoder(PixelFormat::Yuv420p));
//! ctx.initialize(352, 288, CodecId::Mpeg4, Threading::Slice(4)).unwrap();
//! assert_eq!(ctx.slice_context_count(), 4);
//!
//! ctx.set_qscale(8);
//! ctx.compute_block_indices(0, 0).unwrap();
//! ctx.teardown();
//! ```

pub mod codec_id;
pub mod flags;
pub mod mpegvideo;

// 重导出常用类型
pub use codec_id::{CodecId, OutputFormat};
pub use flags::{CodecFlags, FourCc};
pub use mpegvideo::{
    ContextOptions, IdctPermutation, MpegVideoContext, PictureStructure, QuantContext, ScanTable,
    Threading, Unquantizers,
};
