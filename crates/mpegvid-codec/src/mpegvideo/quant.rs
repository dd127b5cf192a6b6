//! 量化状态: qscale 及其派生的色度 qscale / DC scaler 缓存.
//!
//! `QuantContext` 是反量化函数读取的全部状态, 与系数块存储分离,
//! 使上下文可以同时借出量化状态 (只读) 与自身的系数块 (可变).

use super::scantable::{IdctPermutation, ScanTable, permute_scantable};
use super::tables::*;
use crate::codec_id::CodecId;

/// 每个宏块最多的 8x8 块数 (4:4:4 时为 12)
pub const MAX_BLOCKS_PER_MB: usize = 12;

/// 一组 DC scaler / 色度 qscale 表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleTables {
    /// 亮度 DC scaler, 以 qscale 索引
    pub y_dc_scale: &'static [u8; 32],
    /// 色度 DC scaler, 以 chroma_qscale 索引
    pub c_dc_scale: &'static [u8; 32],
    /// 亮度 qscale → 色度 qscale
    pub chroma_qscale: &'static [u8; 32],
}

impl ScaleTables {
    /// MPEG-1 默认表 (DC scaler 恒为 8)
    pub const MPEG1: Self = Self {
        y_dc_scale: &MPEG1_DC_SCALE,
        c_dc_scale: &MPEG1_DC_SCALE,
        chroma_qscale: &DEFAULT_CHROMA_QSCALE,
    };

    /// MPEG-4 / MSMPEG4 表
    pub const MPEG4: Self = Self {
        y_dc_scale: &MPEG4_Y_DC_SCALE,
        c_dc_scale: &MPEG4_C_DC_SCALE,
        chroma_qscale: &DEFAULT_CHROMA_QSCALE,
    };

    /// WMV1/WMV2 表
    pub const WMV1: Self = Self {
        y_dc_scale: &WMV1_Y_DC_SCALE,
        c_dc_scale: &WMV1_C_DC_SCALE,
        chroma_qscale: &DEFAULT_CHROMA_QSCALE,
    };

    /// H.263 Advanced Intra Coding 表
    pub const H263_AIC: Self = Self {
        y_dc_scale: &AIC_DC_SCALE,
        c_dc_scale: &AIC_DC_SCALE,
        chroma_qscale: &H263_CHROMA_QSCALE,
    };

    /// 编解码器的默认表
    pub const fn for_codec(codec_id: CodecId) -> Self {
        match codec_id {
            CodecId::Mpeg4 | CodecId::Msmpeg4v1 | CodecId::Msmpeg4v2 | CodecId::Msmpeg4v3 => {
                Self::MPEG4
            }
            CodecId::Wmv1 | CodecId::Wmv2 => Self::WMV1,
            _ => Self::MPEG1,
        }
    }
}

/// 量化状态
#[derive(Debug, Clone)]
pub struct QuantContext {
    /// 当前 qscale, 始终在 [1, 31]
    pub qscale: i32,
    /// 由 qscale 派生的色度 qscale
    pub chroma_qscale: i32,
    /// 亮度 DC scaler
    pub y_dc_scale: i32,
    /// 色度 DC scaler
    pub c_dc_scale: i32,
    /// 使用中的 scaler 表
    pub scale_tables: ScaleTables,

    /// Intra 量化矩阵 (按 IDCT 排列存放)
    pub intra_matrix: [u16; 64],
    /// Inter 量化矩阵 (按 IDCT 排列存放)
    pub inter_matrix: [u16; 64],

    /// IDCT 系数排列
    pub idct_permutation: [u8; 64],
    /// Intra 块扫描表
    pub intra_scantable: ScanTable,
    /// Inter 块扫描表
    pub inter_scantable: ScanTable,
    /// 排列后的交替水平扫描 (AC 预测)
    pub permutated_intra_h_scantable: [u8; 64],
    /// 排列后的交替垂直扫描 (AC 预测)
    pub permutated_intra_v_scantable: [u8; 64],

    /// 每个块最后一个非零系数的扫描位置, -1 表示空块
    pub block_last_index: [i32; MAX_BLOCKS_PER_MB],

    /// MPEG-2 q_scale_type: 使用非线性 qscale 表
    pub q_scale_type: bool,
    /// 交替垂直扫描
    pub alternate_scan: bool,
    /// H.263 Advanced Intra Coding
    pub h263_aic: bool,
    /// 当前宏块使用 AC 预测
    pub ac_pred: bool,
}

impl QuantContext {
    /// 按系数排列与编解码器默认表构建
    pub fn new(permutation: IdctPermutation, codec_id: CodecId) -> Self {
        let idct_permutation = permutation.table();
        let mut quant = Self {
            qscale: 1,
            chroma_qscale: 1,
            y_dc_scale: 8,
            c_dc_scale: 8,
            scale_tables: ScaleTables::for_codec(codec_id),
            intra_matrix: [0; 64],
            inter_matrix: [0; 64],
            idct_permutation,
            intra_scantable: ScanTable::new(&idct_permutation, &ZIGZAG_SCAN),
            inter_scantable: ScanTable::new(&idct_permutation, &ZIGZAG_SCAN),
            permutated_intra_h_scantable: [0; 64],
            permutated_intra_v_scantable: [0; 64],
            block_last_index: [-1; MAX_BLOCKS_PER_MB],
            q_scale_type: false,
            alternate_scan: false,
            h263_aic: false,
            ac_pred: false,
        };
        quant.init_scantables(false);
        quant.load_matrix(&DEFAULT_INTRA_MATRIX, true);
        quant.load_matrix(&DEFAULT_INTER_MATRIX, false);
        quant.set_qscale(1);
        quant
    }

    /// 设置 qscale 并刷新所有派生值
    ///
    /// 输入被裁剪到 [1, 31].
    pub fn set_qscale(&mut self, qscale: i32) {
        let qscale = qscale.clamp(1, 31);
        let tables = self.scale_tables;

        self.qscale = qscale;
        self.chroma_qscale = tables.chroma_qscale[qscale as usize] as i32;
        self.y_dc_scale = tables.y_dc_scale[qscale as usize] as i32;
        self.c_dc_scale = tables.c_dc_scale[self.chroma_qscale as usize] as i32;
    }

    /// 切换 scaler 表, 并按当前 qscale 重新计算派生值
    pub fn set_scale_tables(&mut self, tables: ScaleTables) {
        self.scale_tables = tables;
        self.set_qscale(self.qscale);
    }

    /// MPEG-2 intra_dc_precision (0..=3, 对应 8..=11 位 DC)
    pub fn set_intra_dc_precision(&mut self, precision: u8) {
        let table = &MPEG2_DC_SCALE[(precision & 3) as usize];
        self.set_scale_tables(ScaleTables {
            y_dc_scale: table,
            c_dc_scale: table,
            chroma_qscale: self.scale_tables.chroma_qscale,
        });
    }

    /// 开关 H.263 Advanced Intra Coding, 同时切换 DC scaler 与色度 qscale 表
    pub fn set_h263_aic(&mut self, enabled: bool, codec_id: CodecId) {
        self.h263_aic = enabled;
        let tables = if enabled {
            ScaleTables::H263_AIC
        } else {
            ScaleTables::for_codec(codec_id)
        };
        self.set_scale_tables(tables);
    }

    /// 按光栅顺序载入量化矩阵, 存储为 IDCT 排列顺序
    pub fn load_matrix(&mut self, raster: &[u8; 64], intra: bool) {
        let matrix = if intra {
            &mut self.intra_matrix
        } else {
            &mut self.inter_matrix
        };
        for (i, &v) in raster.iter().enumerate() {
            matrix[self.idct_permutation[i] as usize] = v as u16;
        }
    }

    /// 重建 intra/inter 扫描表与 AC 预测用的交替扫描
    ///
    /// 只有 WMV 使用互不相同的 intra/inter 表, 其余编解码器两者相同.
    pub fn init_scantables(&mut self, alternate_scan: bool) {
        self.alternate_scan = alternate_scan;
        let base = if alternate_scan {
            &ALTERNATE_VERTICAL_SCAN
        } else {
            &ZIGZAG_SCAN
        };
        self.inter_scantable = ScanTable::new(&self.idct_permutation, base);
        self.intra_scantable = ScanTable::new(&self.idct_permutation, base);
        self.permutated_intra_h_scantable =
            permute_scantable(&ALTERNATE_HORIZONTAL_SCAN, &self.idct_permutation);
        self.permutated_intra_v_scantable =
            permute_scantable(&ALTERNATE_VERTICAL_SCAN, &self.idct_permutation);
    }

    /// 第 n 块的 DC scaler (n < 4 为亮度)
    #[inline]
    pub fn dc_scale(&self, n: usize) -> i32 {
        if n < 4 { self.y_dc_scale } else { self.c_dc_scale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_qscale_clamps() {
        let mut q = QuantContext::new(IdctPermutation::None, CodecId::Mpeg4);
        q.set_qscale(0);
        assert_eq!(q.qscale, 1);
        q.set_qscale(50);
        assert_eq!(q.qscale, 31);
        q.set_qscale(-7);
        assert_eq!(q.qscale, 1);
    }

    #[test]
    fn test_mpeg4_dc_scaler() {
        let mut q = QuantContext::new(IdctPermutation::None, CodecId::Mpeg4);
        q.set_qscale(1);
        assert_eq!((q.y_dc_scale, q.c_dc_scale), (8, 8));
        q.set_qscale(5);
        assert_eq!((q.y_dc_scale, q.c_dc_scale), (10, 9));
        q.set_qscale(31);
        assert_eq!((q.y_dc_scale, q.c_dc_scale), (46, 25));
    }

    #[test]
    fn test_mpeg1_dc_scaler_is_constant() {
        let mut q = QuantContext::new(IdctPermutation::None, CodecId::Mpeg1Video);
        for qs in 1..=31 {
            q.set_qscale(qs);
            assert_eq!(q.y_dc_scale, 8);
            assert_eq!(q.c_dc_scale, 8);
            assert_eq!(q.chroma_qscale, qs);
        }
    }

    #[test]
    fn test_h263_aic_switches_tables() {
        let mut q = QuantContext::new(IdctPermutation::None, CodecId::H263p);
        q.set_qscale(20);
        q.set_h263_aic(true, CodecId::H263p);
        assert_eq!(q.chroma_qscale, 13);
        assert_eq!(q.y_dc_scale, 40);
        assert_eq!(q.c_dc_scale, 26);
        q.set_h263_aic(false, CodecId::H263p);
        assert_eq!(q.chroma_qscale, 20);
        assert_eq!(q.y_dc_scale, 8);
    }

    #[test]
    fn test_intra_dc_precision() {
        let mut q = QuantContext::new(IdctPermutation::None, CodecId::Mpeg2Video);
        q.set_intra_dc_precision(2);
        assert_eq!(q.y_dc_scale, 2);
        assert_eq!(q.c_dc_scale, 2);
    }

    #[test]
    fn test_load_matrix_applies_permutation() {
        let q = QuantContext::new(IdctPermutation::Transpose, CodecId::Mpeg2Video);
        let perm = IdctPermutation::Transpose.table();
        for i in 0..64 {
            assert_eq!(
                q.intra_matrix[perm[i] as usize],
                DEFAULT_INTRA_MATRIX[i] as u16
            );
        }
        assert!(q.inter_matrix.iter().all(|&v| v == 16));
    }

    #[test]
    fn test_init_scantables_alternate() {
        let mut q = QuantContext::new(IdctPermutation::None, CodecId::Mpeg2Video);
        q.init_scantables(true);
        assert_eq!(q.intra_scantable.permutated, ALTERNATE_VERTICAL_SCAN);
        assert_eq!(q.inter_scantable.permutated, ALTERNATE_VERTICAL_SCAN);
        assert_eq!(q.permutated_intra_h_scantable, ALTERNATE_HORIZONTAL_SCAN);
        q.init_scantables(false);
        assert_eq!(q.intra_scantable.permutated, ZIGZAG_SCAN);
    }
}
