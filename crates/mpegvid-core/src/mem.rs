//! 可失败的表分配.
//!
//! 所有按帧几何计算尺寸的数组都经由这里分配: 分配失败 (或超过调用方设置的
//! 单次分配上限) 返回 `OutOfMemory`, 而不是让进程中止.

use crate::error::{MpvError, MpvResult};

/// 分配策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocLimit {
    /// 单次分配的最大字节数, `None` 表示不限制
    pub max_bytes: Option<usize>,
}

impl AllocLimit {
    /// 不限制单次分配大小
    pub const UNLIMITED: Self = Self { max_bytes: None };

    /// 以 `max_bytes` 为单次分配上限
    pub const fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
        }
    }

    /// 分配 `len` 个元素, 全部填充为 `fill`
    pub fn alloc_filled<T: Clone>(&self, len: usize, fill: T, what: &str) -> MpvResult<Vec<T>> {
        let bytes = len.checked_mul(std::mem::size_of::<T>()).ok_or_else(|| {
            MpvError::OutOfMemory(format!("{what}: 元素数 {len} 导致字节数溢出"))
        })?;
        if let Some(max) = self.max_bytes
            && bytes > max
        {
            return Err(MpvError::OutOfMemory(format!(
                "{what}: 请求 {bytes} 字节, 超过上限 {max}"
            )));
        }
        let mut table = Vec::new();
        table
            .try_reserve_exact(len)
            .map_err(|err| MpvError::OutOfMemory(format!("{what}: {err}")))?;
        table.resize(len, fill);
        Ok(table)
    }

    /// 分配 `len` 个默认值 (零) 元素
    pub fn alloc_zeroed<T: Clone + Default>(&self, len: usize, what: &str) -> MpvResult<Vec<T>> {
        self.alloc_filled(len, T::default(), what)
    }
}
