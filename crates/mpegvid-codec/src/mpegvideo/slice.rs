//! 切片上下文: 复制, 行范围分配, 状态合并, 并行执行.
//!
//! 主上下文持有 `slice_count - 1` 个切片上下文. 每个切片上下文拥有自己的私有存储
//! (系数块, AC 预测, 运动估计 map, 暂存区) 与按帧几何分配的宏块标志/DC 预测表,
//! 其余状态按值从主上下文复制.
//! 宏块行范围互不重叠且连续覆盖 `[0, mb_height)`, 并行执行时无需加锁.
//! 执行前主上下文把各切片的行带 (连同上方一行邻居) 分发给切片上下文,
//! 执行后再把各切片自己的行带收回.

use log::{debug, warn};
use mpegvid_core::{MpvError, MpvResult};
use rayon::prelude::*;
use std::ops::Range;

use super::context::MpegVideoContext;
use super::storage::{FrameScratch, MacroblockTables, RowBands, SliceScratch};
use super::types::MAX_SLICE_CONTEXTS;

/// 第 `index` 个切片 (共 `count` 个) 的宏块行范围 `[start, end)`
pub fn slice_row_range(mb_height: usize, index: usize, count: usize) -> (usize, usize) {
    let count = count.max(1);
    let start = (mb_height * index + count / 2) / count;
    let end = (mb_height * (index + 1) + count / 2) / count;
    (start, end)
}

impl MpegVideoContext {
    /// 创建切片上下文并为所有上下文分配私有存储
    ///
    /// 已有的切片上下文先被释放. 超过 `min(32, mb_height)` 的请求会被降低 (记录日志).
    /// 每个切片上下文另外分配一份宏块标志/DC 预测表, 内容取自主上下文.
    /// 切片上下文先于主上下文的私有存储分配; 任一分配失败时已创建的切片上下文全部丢弃,
    /// 主上下文不再挂接任何切片上下文.
    pub fn duplicate(&mut self, slice_count: usize) -> MpvResult<()> {
        if !self.initialized {
            return Err(MpvError::NotInitialized);
        }
        self.free_duplicate_contexts();

        let mb_height = self.geometry.mb_height;
        let max_slices = MAX_SLICE_CONTEXTS.min(mb_height).max(1);
        let mut count = slice_count.max(1);
        if count > max_slices {
            warn!("mpegvideo: 切片数 {count} 超过上限, 降为 {max_slices}");
            count = max_slices;
        }

        let mut workers = Vec::with_capacity(count - 1);
        for index in 1..count {
            let mut worker = self.clone_for_slice();
            worker.tables = MacroblockTables::alloc(&self.geometry, &self.config)?;
            worker.init_duplicate_context()?;
            worker.load_rows(self, 0..mb_height);
            let (start, end) = slice_row_range(mb_height, index, count);
            worker.start_mb_y = start;
            worker.end_mb_y = end;
            workers.push(worker);
        }

        self.start_mb_y = 0;
        self.end_mb_y = slice_row_range(mb_height, 0, count).1;
        self.init_duplicate_context()?;

        self.slice_contexts = workers;
        self.slice_context_count = count;
        debug!("mpegvideo: 切片范围 {:?}", self.slice_ranges());
        Ok(())
    }

    /// 按值复制共享状态, 不含宏块表与私有存储
    fn clone_for_slice(&self) -> MpegVideoContext {
        MpegVideoContext {
            config: self.config.clone(),
            geometry: self.geometry,
            quant: self.quant.clone(),
            picture: self.picture,
            stats: self.stats,
            unquantize: self.unquantize,
            tables: MacroblockTables::default(),
            scratch: SliceScratch::default(),
            start_mb_y: 0,
            end_mb_y: 0,
            slice_contexts: Vec::new(),
            slice_context_count: 1,
            initialized: true,
        }
    }

    /// 分配本上下文的私有存储
    pub fn init_duplicate_context(&mut self) -> MpvResult<()> {
        self.scratch = SliceScratch::alloc(&self.geometry, &self.config)?;
        Ok(())
    }

    /// 丢弃全部切片上下文并释放自身私有存储
    pub(super) fn free_duplicate_contexts(&mut self) {
        self.slice_contexts.clear();
        self.scratch = SliceScratch::default();
        self.slice_context_count = 1;
    }

    /// 把 `src` 的非私有状态合并到 `dst`
    ///
    /// 复制配置、几何、量化状态、图像状态、统计与反量化函数; `dst` 的私有存储与行范围不变.
    /// 合并后按 `dst` 的配置重建块视图, 若 `dst` 尚无帧尺寸暂存区且行跨度已知则分配之.
    pub fn merge_state(dst: &mut MpegVideoContext, src: &MpegVideoContext) -> MpvResult<()> {
        dst.config = src.config.clone();
        dst.geometry = src.geometry;
        dst.quant = src.quant.clone();
        dst.picture = src.picture;
        dst.stats = src.stats;
        dst.unquantize = src.unquantize;
        dst.initialized = src.initialized;

        dst.scratch.rebuild_views(dst.config.codec_tag());
        if dst.scratch.frame.is_none() && dst.picture.linesize != 0 {
            dst.alloc_frame_scratch(dst.picture.linesize).inspect_err(|err| {
                warn!("mpegvideo: 切片上下文暂存区分配失败: {err}");
            })?;
        }
        Ok(())
    }

    /// 把主上下文的状态合并到每个切片上下文
    pub fn sync_slice_contexts(&mut self) -> MpvResult<()> {
        let mut workers = std::mem::take(&mut self.slice_contexts);
        let result = workers
            .iter_mut()
            .try_for_each(|worker| Self::merge_state(worker, self));
        self.slice_contexts = workers;
        result
    }

    /// 从 `primary` 复制宏块行 `rows` 的宏块表与 AC 预测
    fn load_rows(&mut self, primary: &MpegVideoContext, rows: Range<usize>) {
        let bands = RowBands::new(&self.geometry, rows);
        self.tables.copy_rows_from(&primary.tables, &bands);
        self.scratch.ac_val.copy_bands_from(&primary.scratch.ac_val, &bands);
    }

    /// 把每个切片负责的行带 (连同上方一行邻居) 从主上下文复制到切片上下文
    pub fn distribute_slice_rows(&mut self) {
        let mut workers = std::mem::take(&mut self.slice_contexts);
        for worker in &mut workers {
            let (start, end) = worker.row_range();
            worker.load_rows(self, start.saturating_sub(1)..end);
        }
        self.slice_contexts = workers;
    }

    /// 把每个切片上下文在自己行带内写入的宏块表与 AC 预测收回主上下文
    pub fn collect_slice_rows(&mut self) {
        let workers = std::mem::take(&mut self.slice_contexts);
        for worker in &workers {
            let (start, end) = worker.row_range();
            let bands = RowBands::new(&self.geometry, start..end);
            self.tables.copy_rows_from(&worker.tables, &bands);
            self.scratch.ac_val.copy_bands_from(&worker.scratch.ac_val, &bands);
        }
        self.slice_contexts = workers;
    }

    /// 按行跨度分配帧尺寸暂存区 (边缘模拟 + 运动估计)
    pub fn alloc_frame_scratch(&mut self, linesize: isize) -> MpvResult<()> {
        self.scratch.frame = Some(FrameScratch::alloc(linesize, self.config.alloc)?);
        Ok(())
    }

    /// 对每个切片上下文 (含主上下文) 并行执行 `f`
    ///
    /// 执行前分发行带, 执行后 (无论成败) 收回行带, 主上下文因此看到所有切片的写入.
    /// 返回第一个错误 (主上下文优先).
    pub fn execute_slices<F>(&mut self, f: F) -> MpvResult<()>
    where
        F: Fn(&mut MpegVideoContext) -> MpvResult<()> + Sync,
    {
        self.distribute_slice_rows();
        let mut workers = std::mem::take(&mut self.slice_contexts);
        let (primary, rest) = rayon::join(
            || f(self),
            || workers.par_iter_mut().try_for_each(|worker| f(worker)),
        );
        self.slice_contexts = workers;
        self.collect_slice_rows();
        primary.and(rest)
    }

    /// 生效的切片数 (含主上下文)
    pub fn slice_context_count(&self) -> usize {
        self.slice_context_count
    }

    /// 切片上下文 (不含主上下文)
    pub fn slice_contexts(&self) -> &[MpegVideoContext] {
        &self.slice_contexts
    }

    /// 切片上下文 (不含主上下文, 可变)
    pub fn slice_contexts_mut(&mut self) -> &mut [MpegVideoContext] {
        &mut self.slice_contexts
    }

    /// 全部切片的宏块行范围, 主上下文在前
    pub fn slice_ranges(&self) -> Vec<(usize, usize)> {
        std::iter::once(self.row_range())
            .chain(self.slice_contexts.iter().map(|c| c.row_range()))
            .collect()
    }

    /// 本上下文负责的宏块行范围 `[start_mb_y, end_mb_y)`
    pub fn row_range(&self) -> (usize, usize) {
        (self.start_mb_y, self.end_mb_y)
    }
}
