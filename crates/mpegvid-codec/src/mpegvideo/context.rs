//! 编码上下文与生命周期管理.
//!
//! `MpegVideoContext` 是块编解码核心的全部可变状态. 每个上下文持有自己的宏块表与私有存储,
//! 切片上下文 (见 `slice` 模块) 只对自己的宏块行负责, 其余状态按值从主上下文复制.
//!
//! 生命周期:
//! 1. `new(options)` 构建未初始化的上下文
//! 2. `initialize(width, height, codec_id, threading)` 校验几何、分配表、创建切片上下文
//! 3. `resize` 在分辨率变化时重建帧级表
//! 4. `teardown` 释放全部存储 (可重复调用)

use log::{debug, warn};
use mpegvid_core::{AllocLimit, MpvError, MpvResult, PixelFormat};

use super::dequant::Unquantizers;
use super::quant::QuantContext;
use super::storage::{MacroblockTables, SliceScratch};
use super::types::{
    ContextOptions, Geometry, MAX_SLICE_CONTEXTS, PictureState, SliceStatistics, Threading,
};
use crate::codec_id::{CodecId, OutputFormat};
use crate::flags::{CodecFlags, FourCc};

/// 由选项与编解码器推导的只读配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// 编解码器
    pub codec_id: CodecId,
    /// 输出格式族
    pub out_format: OutputFormat,
    /// MSMPEG4 版本号 (非 MSMPEG4/WMV 为 0)
    pub msmpeg4_version: u8,
    /// 使用 H.263 风格 DC/AC 预测
    pub h263_pred: bool,
    /// MPEG-4 quant_type = 1 (MPEG 风格量化矩阵)
    pub mpeg_quant: bool,
    /// 会话参数
    pub options: ContextOptions,
    /// 分配上限
    pub alloc: AllocLimit,
}

impl ContextConfig {
    /// 由会话参数构建, 编解码器在 `initialize` 时确定
    pub fn new(options: ContextOptions) -> Self {
        let alloc = options.max_alloc.map_or(AllocLimit::UNLIMITED, AllocLimit::new);
        Self::for_codec(CodecId::Mpeg1Video, options, alloc)
    }

    /// 切换编解码器并刷新派生字段
    pub fn with_codec(self, codec_id: CodecId) -> Self {
        Self::for_codec(codec_id, self.options, self.alloc)
    }

    fn for_codec(codec_id: CodecId, options: ContextOptions, alloc: AllocLimit) -> Self {
        Self {
            codec_id,
            out_format: codec_id.output_format(),
            msmpeg4_version: codec_id.msmpeg4_version(),
            h263_pred: codec_id.uses_h263_prediction(),
            mpeg_quant: false,
            options,
            alloc,
        }
    }

    /// 编解码标志
    pub fn flags(&self) -> CodecFlags {
        self.options.flags
    }

    /// FourCC 标签
    pub fn codec_tag(&self) -> FourCc {
        self.options.codec_tag
    }

    /// 是否需要隔行运动向量表
    pub fn needs_field_mv_tables(&self) -> bool {
        self.codec_id == CodecId::Mpeg4 || self.options.flags.contains(CodecFlags::INTERLACED_ME)
    }
}

/// 块编解码上下文
#[derive(Debug)]
pub struct MpegVideoContext {
    pub(super) config: ContextConfig,
    pub(super) geometry: Geometry,
    /// 量化状态
    pub quant: QuantContext,
    /// 图像级状态
    pub picture: PictureState,
    /// 编码统计
    pub stats: SliceStatistics,
    pub(super) unquantize: Unquantizers,
    /// 宏块标志与预测表 (切片上下文只有自己的行带有效)
    pub tables: MacroblockTables,
    /// 私有存储
    pub scratch: SliceScratch,
    pub(super) start_mb_y: usize,
    pub(super) end_mb_y: usize,
    pub(super) slice_contexts: Vec<MpegVideoContext>,
    pub(super) slice_context_count: usize,
    pub(super) initialized: bool,
}

impl MpegVideoContext {
    /// 创建未初始化的上下文
    pub fn new(options: ContextOptions) -> Self {
        let config = ContextConfig::new(options);
        let quant = QuantContext::new(config.options.idct_permutation, config.codec_id);
        Self {
            config,
            geometry: Geometry::default(),
            quant,
            picture: PictureState::default(),
            stats: SliceStatistics::default(),
            unquantize: Unquantizers::MPEG1,
            tables: MacroblockTables::default(),
            scratch: SliceScratch::default(),
            start_mb_y: 0,
            end_mb_y: 0,
            slice_contexts: Vec::new(),
            slice_context_count: 1,
            initialized: false,
        }
    }

    /// 按帧尺寸与编解码器初始化
    ///
    /// 全部校验在分配前完成. 任一步失败时上下文被完整释放后再返回错误.
    pub fn initialize(
        &mut self,
        width: i32,
        height: i32,
        codec_id: CodecId,
        threading: Threading,
    ) -> MpvResult<()> {
        self.teardown();
        let result = self.try_initialize(width, height, codec_id, threading);
        if let Err(err) = &result {
            warn!("mpegvideo: 初始化失败 ({codec_id}, {width}x{height}): {err}");
            self.teardown();
        }
        result
    }

    fn try_initialize(
        &mut self,
        width: i32,
        height: i32,
        codec_id: CodecId,
        threading: Threading,
    ) -> MpvResult<()> {
        let options = &self.config.options;
        options.validate()?;
        if options.pixel_format == PixelFormat::None {
            return Err(MpvError::InvalidGeometry(
                "不支持解码到未设置的像素格式".into(),
            ));
        }
        let geometry = Geometry::compute(
            width,
            height,
            codec_id,
            self.picture.progressive_sequence,
            options.pixel_format,
        )?;

        let mut nb_slices = threading.requested_slices().max(1);
        if options.encoding
            && let Some(slices) = options.slices
        {
            nb_slices = slices;
        }

        self.config = self.config.clone().with_codec(codec_id);
        self.dct_init();
        self.geometry = geometry;
        self.init_context_frame()?;

        let max_slices = MAX_SLICE_CONTEXTS.min(geometry.mb_height);
        if nb_slices > max_slices {
            warn!("mpegvideo: 线程/切片数过多 ({nb_slices}), 降为 {max_slices}");
            nb_slices = max_slices;
        }

        self.initialized = true;
        self.duplicate(nb_slices)?;

        debug!(
            "mpegvideo: 初始化完成, codec={}, {}x{} ({}x{} 宏块), 切片数={}, 反量化={}",
            codec_id,
            width,
            height,
            geometry.mb_width,
            geometry.mb_height,
            self.slice_context_count,
            self.unquantize.name,
        );
        Ok(())
    }

    /// 选择反量化函数并重建量化状态 (扫描表, 默认矩阵, scaler 表)
    fn dct_init(&mut self) {
        let options = &self.config.options;
        self.quant = QuantContext::new(options.idct_permutation, self.config.codec_id);
        self.unquantize = Unquantizers::resolve(
            self.config.codec_id,
            self.config.mpeg_quant,
            options.flags,
        );
    }

    /// 分配帧级宏块表
    pub fn init_context_frame(&mut self) -> MpvResult<()> {
        self.tables = MacroblockTables::alloc(&self.geometry, &self.config)?;
        Ok(())
    }

    /// 释放帧级宏块表、切片上下文与私有存储, 行跨度清零
    pub fn free_context_frame(&mut self) {
        self.free_duplicate_contexts();
        self.tables = MacroblockTables::default();
        self.picture.linesize = 0;
        self.picture.uvlinesize = 0;
    }

    /// 释放全部存储, 回到未初始化状态
    ///
    /// 可重复调用.
    pub fn teardown(&mut self) {
        self.free_context_frame();
        self.slice_context_count = 1;
        self.start_mb_y = 0;
        self.end_mb_y = 0;
        self.initialized = false;
    }

    /// 分辨率变化: 按新尺寸重建帧级表, 保持切片数
    ///
    /// 失败时上下文被完整释放.
    pub fn resize(&mut self, width: i32, height: i32) -> MpvResult<()> {
        if !self.initialized {
            return Err(MpvError::NotInitialized);
        }
        let nb_slices = self.slice_context_count;
        self.free_context_frame();

        let result = self.try_resize(width, height, nb_slices);
        if let Err(err) = &result {
            warn!("mpegvideo: 分辨率变更失败 ({width}x{height}): {err}");
            self.teardown();
        }
        result
    }

    fn try_resize(&mut self, width: i32, height: i32, nb_slices: usize) -> MpvResult<()> {
        self.geometry = Geometry::compute(
            width,
            height,
            self.config.codec_id,
            self.picture.progressive_sequence,
            self.config.options.pixel_format,
        )?;
        self.init_context_frame()?;
        self.duplicate(nb_slices)?;
        debug!(
            "mpegvideo: 分辨率变更为 {}x{} ({}x{} 宏块)",
            width, height, self.geometry.mb_width, self.geometry.mb_height
        );
        Ok(())
    }

    /// 是否已初始化
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 只读配置
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// 帧几何
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// 当前生效的反量化函数对
    pub fn unquantizers(&self) -> Unquantizers {
        self.unquantize
    }

    /// 设置 qscale 并刷新派生值
    pub fn set_qscale(&mut self, qscale: i32) {
        self.quant.set_qscale(qscale);
    }

    /// 切换 MPEG-4 quant_type 并重新选择反量化函数
    pub fn set_mpeg_quant(&mut self, mpeg_quant: bool) {
        self.config.mpeg_quant = mpeg_quant;
        self.unquantize =
            Unquantizers::resolve(self.config.codec_id, mpeg_quant, self.config.flags());
    }

    /// 对逻辑块 `n` 做 Intra 反量化 (亮度用 qscale, 色度用 chroma_qscale)
    pub fn dequantize_intra(&mut self, n: usize) -> MpvResult<()> {
        let qscale = self.block_qscale(n);
        let block = self.scratch.block_mut(n).ok_or(MpvError::NotInitialized)?;
        (self.unquantize.intra)(&self.quant, block, n, qscale);
        Ok(())
    }

    /// 对逻辑块 `n` 做 Inter 反量化 (亮度用 qscale, 色度用 chroma_qscale)
    pub fn dequantize_inter(&mut self, n: usize) -> MpvResult<()> {
        let qscale = self.block_qscale(n);
        let block = self.scratch.block_mut(n).ok_or(MpvError::NotInitialized)?;
        (self.unquantize.inter)(&self.quant, block, n, qscale);
        Ok(())
    }

    #[inline]
    fn block_qscale(&self, n: usize) -> i32 {
        if n < 4 {
            self.quant.qscale
        } else {
            self.quant.chroma_qscale
        }
    }
}
