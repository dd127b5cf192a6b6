//! MPEG 系列块编解码核心
//!
//! ## 模块结构
//!
//! - `tables`: 常量表 (扫描顺序, DC scaler, 色度 qscale, 非线性 qscale, 默认矩阵)
//! - `scantable`: IDCT 系数排列与扫描表构建
//! - `quant`: 量化状态与 qscale 派生值
//! - `dequant`: 反量化 (MPEG-1, MPEG-2, H.263)
//! - `types`: 线程模式, 创建选项, 帧几何, 图像状态
//! - `storage`: 帧级宏块表与切片私有存储
//! - `context`: 编码上下文生命周期
//! - `slice`: 切片上下文复制, 合并与并行执行
//! - `block_index`: 宏块块下标与平面偏移

mod block_index;
mod context;
pub mod dequant;
pub mod quant;
pub mod scantable;
mod slice;
pub mod storage;
pub mod tables;
pub mod types;

pub use context::{ContextConfig, MpegVideoContext};
pub use dequant::{Block, UnquantizeFn, Unquantizers};
pub use quant::{MAX_BLOCKS_PER_MB, QuantContext, ScaleTables};
pub use scantable::{IdctPermutation, ScanTable, permute_scantable};
pub use slice::slice_row_range;
pub use types::{
    ContextOptions, Geometry, MAX_SLICE_CONTEXTS, ME_MAP_SIZE, PictureState, PictureStructure,
    SliceStatistics, Threading,
};
