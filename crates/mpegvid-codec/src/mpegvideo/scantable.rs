//! 扫描表构建.
//!
//! 将基础扫描顺序 (zigzag / 交替扫描) 与目标 IDCT 实现的系数排列组合,
//! 得到 "扫描位置 → 排列后光栅位置" 的映射, 并推导每个扫描位置的光栅上界.

use mpegvid_core::MpvError;

/// IDCT 系数排列方式
///
/// 不同的 IDCT 实现要求系数以不同的光栅顺序存放, 扫描表和量化矩阵都需要按同一排列变换.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdctPermutation {
    /// 不排列 (标准光栅顺序)
    #[default]
    None,
    /// libmpeg2 风格的行内排列
    Libmpeg2,
    /// 转置
    Transpose,
    /// 部分转置
    PartialTranspose,
    /// SSE2 行排列
    Sse2,
}

const SSE2_ROW_PERM: [u8; 8] = [0, 4, 1, 5, 2, 6, 3, 7];

impl IdctPermutation {
    /// 构建 64 项排列表
    pub fn table(&self) -> [u8; 64] {
        let mut perm = [0u8; 64];
        for (i, slot) in perm.iter_mut().enumerate() {
            let i = i as u8;
            *slot = match self {
                Self::None => i,
                Self::Libmpeg2 => (i & 0x38) | ((i & 6) >> 1) | ((i & 1) << 2),
                Self::Transpose => ((i & 7) << 3) | (i >> 3),
                Self::PartialTranspose => (i & 0x24) | ((i & 3) << 3) | ((i >> 3) & 3),
                Self::Sse2 => (i & 0x38) | SSE2_ROW_PERM[(i & 7) as usize],
            };
        }
        perm
    }
}

impl std::str::FromStr for IdctPermutation {
    type Err = MpvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "libmpeg2" => Ok(Self::Libmpeg2),
            "transpose" => Ok(Self::Transpose),
            "partial_transpose" => Ok(Self::PartialTranspose),
            "sse2" => Ok(Self::Sse2),
            other => Err(MpvError::InvalidArgument(format!("未知 IDCT 排列: {other}"))),
        }
    }
}

/// 扫描表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTable {
    /// 基础扫描顺序 (未排列)
    pub scantable: &'static [u8; 64],
    /// 扫描位置 → 排列后的光栅位置
    pub permutated: [u8; 64],
    /// 扫描位置 0..=i 中出现过的最大光栅位置
    ///
    /// H.263 反量化按空间距离 (而非扫描距离) 限定非零系数范围时使用.
    pub raster_end: [u8; 64],
}

impl ScanTable {
    /// 由系数排列和基础扫描顺序构建扫描表
    pub fn new(permutation: &[u8; 64], base_order: &'static [u8; 64]) -> Self {
        let permutated = permute_scantable(base_order, permutation);

        let mut raster_end = [0u8; 64];
        let mut end = 0u8;
        for (slot, &j) in raster_end.iter_mut().zip(permutated.iter()) {
            end = end.max(j);
            *slot = end;
        }

        Self {
            scantable: base_order,
            permutated,
            raster_end,
        }
    }

    /// 最后一个非零扫描位置对应的光栅上界
    ///
    /// `last_index < 0` (空块) 返回 `None`.
    pub fn raster_bound(&self, last_index: i32) -> Option<usize> {
        usize::try_from(last_index)
            .ok()
            .and_then(|i| self.raster_end.get(i))
            .map(|&end| end as usize)
    }
}

/// 按系数排列变换扫描顺序: `dst[i] = permutation[src[i]]`
pub fn permute_scantable(src: &[u8; 64], permutation: &[u8; 64]) -> [u8; 64] {
    let mut dst = [0u8; 64];
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d = permutation[s as usize];
    }
    dst
}
