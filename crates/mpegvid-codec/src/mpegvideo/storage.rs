//! 上下文持有的表与缓冲区.
//!
//! - `MacroblockTables`: 宏块标志与 DC 预测表, 每个上下文按帧几何各持有一份,
//!   切片上下文只对自己的宏块行负责, 行带经 `RowBands` 与主上下文交换
//! - `SliceScratch`: 切片私有存储 (系数块, AC 预测, 运动估计 map, 降噪累加, 帧尺寸暂存区),
//!   每个上下文各持有一份
//!
//! 预测表按 "左边界一列 + 上边界一行" 布局, 下标全部为表内绝对下标,
//! 边缘宏块访问左/上/左上邻居时不会越界.

use std::ops::Range;

use mpegvid_core::imgutils::align_up;
use mpegvid_core::{AllocLimit, MpvError, MpvResult};

use super::context::ContextConfig;
use super::dequant::Block;
use super::quant::MAX_BLOCKS_PER_MB;
use super::types::{Geometry, ME_MAP_SIZE};
use crate::codec_id::OutputFormat;
use crate::flags::FourCc;

/// DC 预测器的复位值
pub const DC_PRED_RESET: i16 = 1024;

/// 一段宏块行 `[start, end)` 在各类表中占据的下标范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBands {
    /// `mb_stride` 跨度的宏块表
    pub mb: Range<usize>,
    /// `b8_stride` 跨度的亮度预测表与 `coded_block`
    pub luma: Range<usize>,
    /// Cb, Cr 预测表
    pub chroma: [Range<usize>; 2],
}

impl RowBands {
    /// 计算宏块行 `rows` 的下标范围
    ///
    /// 每行的左边界项归属于上一段, 边界项从不被宏块写入.
    pub fn new(geometry: &Geometry, rows: Range<usize>) -> Self {
        let (mb_stride, b8_stride) = (geometry.mb_stride, geometry.b8_stride);
        let [luma_bias, cb_bias, cr_bias] = geometry.plane_biases();
        let chroma = |bias: usize| bias + rows.start * mb_stride..bias + rows.end * mb_stride;
        Self {
            mb: rows.start * mb_stride..rows.end * mb_stride,
            luma: luma_bias + 2 * rows.start * b8_stride..luma_bias + 2 * rows.end * b8_stride,
            chroma: [chroma(cb_bias), chroma(cr_bias)],
        }
    }
}

/// 把 `src[range]` 复制到 `dst[range]`, 范围截断到两者共同长度
fn copy_band<T: Clone>(dst: &mut [T], src: &[T], range: &Range<usize>) {
    let end = range.end.min(dst.len()).min(src.len());
    if range.start < end {
        dst[range.start..end].clone_from_slice(&src[range.start..end]);
    }
}

/// 写入前检查下标, 未分配的表同样按越界报错
fn slot_mut<'a, T>(data: &'a mut [T], idx: usize, what: &str) -> MpvResult<&'a mut T> {
    let len = data.len();
    data.get_mut(idx).ok_or_else(|| {
        if len == 0 {
            MpvError::MissingTable(what.to_string())
        } else {
            MpvError::InvalidArgument(format!("{what}: 下标 {idx} 超出表长度 {len}"))
        }
    })
}

/// 三平面共用一块存储的预测表
///
/// 布局: `[亮度 (b8_stride 跨度) | Cb (mb_stride 跨度) | Cr (mb_stride 跨度)]`,
/// 每个平面的起点偏移由 `biases` 给出.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaneArena<T> {
    data: Vec<T>,
    biases: [usize; 3],
    name: &'static str,
}

impl<T: Clone> PlaneArena<T> {
    /// 按几何分配 `yc_size` 项, 全部填充为 `fill`
    pub fn alloc(
        geometry: &Geometry,
        fill: T,
        limit: AllocLimit,
        what: &'static str,
    ) -> MpvResult<Self> {
        Ok(Self {
            data: limit.alloc_filled(geometry.yc_size(), fill, what)?,
            biases: geometry.plane_biases(),
            name: what,
        })
    }

    /// 把下标 `idx` 处的项设为 `value`
    ///
    /// 表未分配返回 `MissingTable`, 越界返回 `InvalidArgument`.
    pub fn set(&mut self, idx: usize, value: T) -> MpvResult<()> {
        *slot_mut(&mut self.data, idx, self.name)? = value;
        Ok(())
    }

    /// 从 `src` 复制 `bands` 覆盖的三个平面的行带
    pub fn copy_bands_from(&mut self, src: &PlaneArena<T>, bands: &RowBands) {
        copy_band(&mut self.data, &src.data, &bands.luma);
        for chroma in &bands.chroma {
            copy_band(&mut self.data, &src.data, chroma);
        }
    }
}

impl<T> PlaneArena<T> {
    /// 是否未分配
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 总项数
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 平面起点偏移 (0 = 亮度, 1 = Cb, 2 = Cr)
    pub fn bias(&self, plane: usize) -> usize {
        self.biases[plane]
    }

    /// 全部存储
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// 全部存储 (可变)
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// 按绝对下标读取
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.data.get(idx)
    }

    /// 按绝对下标可变访问
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.data.get_mut(idx)
    }
}

/// 带起点偏移的单平面表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BiasedTable<T> {
    /// 存储
    pub data: Vec<T>,
    /// 坐标 (0, 0) 对应的下标
    pub bias: usize,
}

impl<T> BiasedTable<T> {
    /// 是否未分配
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 隔行运动向量表: `[场][方向]` 共 4 张, 连续存放
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMvTables {
    data: Vec<[i16; 2]>,
    table_size: usize,
    bias: usize,
}

impl FieldMvTables {
    fn alloc(geometry: &Geometry, limit: AllocLimit) -> MpvResult<Self> {
        let table_size = geometry.mv_table_size();
        let len = table_size.checked_mul(4).ok_or_else(|| {
            MpvError::OutOfMemory("p_field_mv_table: 尺寸溢出".into())
        })?;
        Ok(Self {
            data: limit.alloc_zeroed(len, "p_field_mv_table")?,
            table_size,
            bias: geometry.mb_stride + 1,
        })
    }

    /// 是否未分配
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 单张表的项数
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    fn index(&self, field: usize, dir: usize, mb_xy: usize) -> usize {
        self.bias + (field * 2 + dir) * self.table_size + mb_xy
    }

    /// 读取宏块 `mb_xy` 在 `[field][dir]` 表中的运动向量
    pub fn get(&self, field: usize, dir: usize, mb_xy: usize) -> Option<[i16; 2]> {
        self.data.get(self.index(field, dir, mb_xy)).copied()
    }

    /// 写入宏块 `mb_xy` 在 `[field][dir]` 表中的运动向量
    pub fn set(&mut self, field: usize, dir: usize, mb_xy: usize, mv: [i16; 2]) -> MpvResult<()> {
        let idx = self.index(field, dir, mb_xy);
        *slot_mut(&mut self.data, idx, "p_field_mv_table")? = mv;
        Ok(())
    }

    fn copy_band_from(&mut self, src: &FieldMvTables, mb_band: &Range<usize>) {
        if self.table_size != src.table_size {
            return;
        }
        for table in 0..4 {
            let offset = self.bias + table * self.table_size;
            let band = offset + mb_band.start..offset + mb_band.end;
            copy_band(&mut self.data, &src.data, &band);
        }
    }
}

/// 宏块标志与预测表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroblockTables {
    /// 宏块序号 → 宏块表下标 (`mb_num + 1` 项)
    pub mb_index2xy: Vec<usize>,
    /// 隔行运动向量表 (MPEG-4 或隔行运动估计)
    pub p_field_mv: FieldMvTables,
    /// 每个 8x8 块是否编码 (H.263 族)
    pub coded_block: BiasedTable<u8>,
    /// 每个宏块的 CBP (H.263 族)
    pub cbp_table: Vec<u8>,
    /// 每个宏块的预测方向 (H.263 族)
    pub pred_dir_table: Vec<u8>,
    /// DC 预测器 (解码或 H.263 预测编码), 初值 1024
    pub dc_val: PlaneArena<i16>,
    /// 宏块跳过标志 (多 2 项用于快速检测切片结束)
    pub mbskip_table: Vec<u8>,
    /// 宏块是否为 Intra, 初值 1
    pub mbintra_table: Vec<u8>,
    /// 错误恢复: 每宏块错误状态 (解码)
    pub error_status_table: Vec<u8>,
    /// 错误恢复: 临时缓冲 (解码)
    pub er_temp_buffer: Vec<u8>,
}

impl MacroblockTables {
    /// 按几何与编解码配置分配全部帧级表
    pub fn alloc(geometry: &Geometry, config: &ContextConfig) -> MpvResult<Self> {
        let limit = config.alloc;
        let mb_array_size = geometry.mb_array_size;
        let mut tables = Self::default();

        let mut mb_index2xy = limit.alloc_zeroed(geometry.mb_num + 1, "mb_index2xy")?;
        for y in 0..geometry.mb_height {
            for x in 0..geometry.mb_width {
                mb_index2xy[x + y * geometry.mb_width] = geometry.mb_xy(x, y);
            }
        }
        mb_index2xy[geometry.mb_num] =
            (geometry.mb_height - 1) * geometry.mb_stride + geometry.mb_width;
        tables.mb_index2xy = mb_index2xy;

        if config.needs_field_mv_tables() {
            tables.p_field_mv = FieldMvTables::alloc(geometry, limit)?;
        }

        if config.out_format == OutputFormat::H263 {
            let size = geometry.y_size() + (geometry.mb_height & 1) * 2 * geometry.b8_stride;
            tables.coded_block = BiasedTable {
                data: limit.alloc_zeroed(size, "coded_block")?,
                bias: geometry.b8_stride + 1,
            };
            tables.cbp_table = limit.alloc_zeroed(mb_array_size, "cbp_table")?;
            tables.pred_dir_table = limit.alloc_zeroed(mb_array_size, "pred_dir_table")?;
        }

        if config.h263_pred || !config.options.encoding {
            tables.dc_val = PlaneArena::alloc(geometry, DC_PRED_RESET, limit, "dc_val")?;
        }

        tables.mbskip_table = limit.alloc_zeroed(mb_array_size + 2, "mbskip_table")?;
        tables.mbintra_table = limit.alloc_filled(mb_array_size, 1u8, "mbintra_table")?;

        if !config.options.encoding {
            tables.error_status_table = limit.alloc_zeroed(mb_array_size, "error_status_table")?;
            let er_temp = (geometry.mb_height + 1) * geometry.mb_stride * 17;
            tables.er_temp_buffer = limit.alloc_zeroed(er_temp, "er_temp_buffer")?;
        }

        Ok(tables)
    }

    /// 从 `src` 复制 `bands` 覆盖的行带 (宏块标志, 场 MV, 编码块, DC 预测)
    ///
    /// `mb_index2xy` 只随几何变化, 错误恢复临时缓冲不含跨切片状态, 两者都不复制.
    pub fn copy_rows_from(&mut self, src: &MacroblockTables, bands: &RowBands) {
        self.p_field_mv.copy_band_from(&src.p_field_mv, &bands.mb);
        copy_band(&mut self.coded_block.data, &src.coded_block.data, &bands.luma);
        copy_band(&mut self.cbp_table, &src.cbp_table, &bands.mb);
        copy_band(&mut self.pred_dir_table, &src.pred_dir_table, &bands.mb);
        self.dc_val.copy_bands_from(&src.dc_val, bands);
        copy_band(&mut self.mbskip_table, &src.mbskip_table, &bands.mb);
        copy_band(&mut self.mbintra_table, &src.mbintra_table, &bands.mb);
        copy_band(&mut self.error_status_table, &src.error_status_table, &bands.mb);
    }

    /// 写入宏块 `mb_xy` 的 Intra 标志
    pub fn set_mb_intra(&mut self, mb_xy: usize, intra: bool) -> MpvResult<()> {
        *slot_mut(&mut self.mbintra_table, mb_xy, "mbintra_table")? = u8::from(intra);
        Ok(())
    }

    /// 写入 8x8 块 `idx` 的编码标志
    pub fn set_coded_block(&mut self, idx: usize, coded: bool) -> MpvResult<()> {
        *slot_mut(&mut self.coded_block.data, idx, "coded_block")? = u8::from(coded);
        Ok(())
    }

    /// 是否所有表都未分配
    pub fn is_empty(&self) -> bool {
        self.mb_index2xy.is_empty()
            && self.p_field_mv.is_empty()
            && self.coded_block.is_empty()
            && self.cbp_table.is_empty()
            && self.pred_dir_table.is_empty()
            && self.dc_val.is_empty()
            && self.mbskip_table.is_empty()
            && self.mbintra_table.is_empty()
            && self.error_status_table.is_empty()
            && self.er_temp_buffer.is_empty()
    }
}

/// 块视图: 宏块内 12 个逻辑块 → 第一组系数块中的存储位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockViews([usize; MAX_BLOCKS_PER_MB]);

impl BlockViews {
    /// 按 FourCC 构建; `VCR2` 交换 U/V 两个色度块
    pub fn new(codec_tag: FourCc) -> Self {
        let mut views = [0; MAX_BLOCKS_PER_MB];
        for (i, v) in views.iter_mut().enumerate() {
            *v = i;
        }
        if codec_tag == FourCc::VCR2 {
            views.swap(4, 5);
        }
        Self(views)
    }

    /// 逻辑块 `n` 对应的存储位置
    #[inline]
    pub fn get(&self, n: usize) -> Option<usize> {
        self.0.get(n).copied()
    }

    /// 全部映射
    pub fn as_array(&self) -> &[usize; MAX_BLOCKS_PER_MB] {
        &self.0
    }
}

impl Default for BlockViews {
    fn default() -> Self {
        Self::new(FourCc::default())
    }
}

/// 按帧行跨度分配的暂存区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameScratch {
    /// 分配时使用的行跨度
    pub linesize: isize,
    /// 边缘模拟缓冲
    pub edge_emu_buffer: Vec<u8>,
    /// 运动估计暂存区
    pub me_scratchpad: Vec<u8>,
    /// RD 暂存视图在 `me_scratchpad` 中的偏移
    pub rd_offset: usize,
    /// B 帧暂存视图在 `me_scratchpad` 中的偏移
    pub b_offset: usize,
    /// OBMC 暂存视图在 `me_scratchpad` 中的偏移
    pub obmc_offset: usize,
}

impl FrameScratch {
    /// 按行跨度分配
    ///
    /// 行跨度小于 24 字节时暂存区无法容纳一个宏块加滤波边缘, 返回 `InvalidGeometry`.
    pub fn alloc(linesize: isize, limit: AllocLimit) -> MpvResult<Self> {
        if linesize < 24 {
            return Err(MpvError::InvalidGeometry(format!(
                "行跨度 {linesize} 过小, 无法分配暂存缓冲"
            )));
        }
        let alloc_size = align_up(linesize.unsigned_abs() + 64, 32);
        Ok(Self {
            linesize,
            edge_emu_buffer: limit.alloc_zeroed(alloc_size * 4 * 70, "edge_emu_buffer")?,
            me_scratchpad: limit.alloc_zeroed(alloc_size * 4 * 16 * 2, "me_scratchpad")?,
            rd_offset: 0,
            b_offset: 0,
            obmc_offset: 16,
        })
    }
}

/// 切片私有存储
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceScratch {
    /// 系数块组 (解码 1 组, 编码 2 组), 每组 12 块
    pub blocks: Vec<[Block; MAX_BLOCKS_PER_MB]>,
    /// 逻辑块 → 第一组中的存储位置
    pub views: BlockViews,
    /// AC 预测器 (H.263 族), 每项为一行 + 一列共 16 个系数
    pub ac_val: PlaneArena<[i16; 16]>,
    /// 运动估计 map, 后半部分为 score map (编码)
    pub me_map: Vec<u32>,
    /// 运动估计 map 的代数
    pub me_map_generation: u32,
    /// 降噪: intra/inter 两组 DCT 误差累加 (编码且开启降噪)
    pub dct_error_sum: Vec<[i32; 64]>,
    /// 降噪: intra/inter 两组累加的块数
    pub dct_count: [u32; 2],
    /// 帧尺寸暂存区, 行跨度已知后分配
    pub frame: Option<FrameScratch>,
}

impl SliceScratch {
    /// 分配一个上下文的私有存储
    pub fn alloc(geometry: &Geometry, config: &ContextConfig) -> MpvResult<Self> {
        let limit = config.alloc;
        let encoding = config.options.encoding;
        let mut scratch = Self {
            views: BlockViews::new(config.options.codec_tag),
            ..Default::default()
        };

        if encoding {
            scratch.me_map = limit.alloc_zeroed(2 * ME_MAP_SIZE, "me_map")?;
            if config.options.noise_reduction {
                scratch.dct_error_sum = limit.alloc_filled(2, [0i32; 64], "dct_error_sum")?;
            }
        }

        let sets = 1 + usize::from(encoding);
        scratch.blocks = limit.alloc_filled(sets, [[0i16; 64]; MAX_BLOCKS_PER_MB], "blocks")?;

        if config.out_format == OutputFormat::H263 {
            scratch.ac_val = PlaneArena::alloc(geometry, [0i16; 16], limit, "ac_val")?;
        }

        Ok(scratch)
    }

    /// 按 FourCC 重建块视图
    pub fn rebuild_views(&mut self, codec_tag: FourCc) {
        self.views = BlockViews::new(codec_tag);
    }

    /// 运动估计 map (前半部分)
    pub fn me_map(&self) -> &[u32] {
        &self.me_map[..self.me_map.len() / 2]
    }

    /// 运动估计 score map (后半部分)
    pub fn me_score_map(&self) -> &[u32] {
        &self.me_map[self.me_map.len() / 2..]
    }

    /// 逻辑块 `n` 的系数 (经块视图映射)
    pub fn block(&self, n: usize) -> Option<&Block> {
        let idx = self.views.get(n)?;
        self.blocks.first().map(|set| &set[idx])
    }

    /// 逻辑块 `n` 的系数 (可变)
    pub fn block_mut(&mut self, n: usize) -> Option<&mut Block> {
        let idx = self.views.get(n)?;
        self.blocks.first_mut().map(|set| &mut set[idx])
    }

    /// 是否所有存储都未分配
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.ac_val.is_empty()
            && self.me_map.is_empty()
            && self.dct_error_sum.is_empty()
            && self.frame.is_none()
    }
}
