//! 反量化 (MPEG-1, MPEG-2, H.263 三族)
//!
//! 每个函数对一个 8x8 系数块做原地变换, 整数算术与各标准的参考实现逐位一致:
//! 中间值用 `i32` 计算, 写回时截断为 `i16`. 值为 0 的系数不做乘法.
//!
//! 选择哪个函数由 (编解码器, mpeg_quant, BITEXACT) 在上下文初始化时决定一次,
//! 以函数指针形式缓存, 逐块热路径中不再判断.

use super::quant::QuantContext;
use super::tables::MPEG2_NON_LINEAR_QSCALE;
use crate::codec_id::{CodecId, OutputFormat};
use crate::flags::CodecFlags;

/// 8x8 系数块
pub type Block = [i16; 64];

/// 反量化函数: (量化状态, 系数块, 块序号 n, qscale)
///
/// `n < 4` 为亮度块, 其余为色度块; 块序号决定 DC scaler 和 `block_last_index` 的取值.
pub type UnquantizeFn = fn(&QuantContext, &mut Block, usize, i32);

/// 已解析的反量化函数对
#[derive(Clone, Copy)]
pub struct Unquantizers {
    /// Intra 块反量化
    pub intra: UnquantizeFn,
    /// Inter 块反量化
    pub inter: UnquantizeFn,
    /// 解析结果的名称, 用于日志与诊断
    pub name: &'static str,
}

impl std::fmt::Debug for Unquantizers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unquantizers")
            .field("name", &self.name)
            .finish()
    }
}

impl Unquantizers {
    /// MPEG-1 反量化对
    pub const MPEG1: Self = Self {
        intra: unquantize_mpeg1_intra,
        inter: unquantize_mpeg1_inter,
        name: "mpeg1",
    };

    /// MPEG-2 反量化对
    pub const MPEG2: Self = Self {
        intra: unquantize_mpeg2_intra,
        inter: unquantize_mpeg2_inter,
        name: "mpeg2",
    };

    /// MPEG-2 反量化对 (intra 带失配控制)
    pub const MPEG2_BITEXACT: Self = Self {
        intra: unquantize_mpeg2_intra_bitexact,
        inter: unquantize_mpeg2_inter,
        name: "mpeg2_bitexact",
    };

    /// H.263 反量化对
    pub const H263: Self = Self {
        intra: unquantize_h263_intra,
        inter: unquantize_h263_inter,
        name: "h263",
    };

    /// 按编解码器、量化类型与标志解析反量化函数对
    ///
    /// `mpeg_quant` 对应 MPEG-4 VOL 的 quant_type = 1.
    pub fn resolve(codec_id: CodecId, mpeg_quant: bool, flags: CodecFlags) -> Self {
        if mpeg_quant || codec_id == CodecId::Mpeg2Video {
            if flags.contains(CodecFlags::BITEXACT) {
                Self::MPEG2_BITEXACT
            } else {
                Self::MPEG2
            }
        } else if matches!(
            codec_id.output_format(),
            OutputFormat::H263 | OutputFormat::H261
        ) {
            Self::H263
        } else {
            Self::MPEG1
        }
    }
}

#[inline]
fn last_index(quant: &QuantContext, n: usize) -> i32 {
    quant.block_last_index.get(n).copied().unwrap_or(-1)
}

/// MPEG-2 有效 qscale: 非线性表或 2 倍线性
#[inline]
fn mpeg2_qscale(quant: &QuantContext, qscale: i32) -> i32 {
    if quant.q_scale_type {
        MPEG2_NON_LINEAR_QSCALE[qscale.clamp(0, 31) as usize] as i32
    } else {
        qscale << 1
    }
}

/// MPEG-2 处理到的最后扫描位置: alternate_scan 时处理全部 64 个系数
#[inline]
fn mpeg2_last_index(quant: &QuantContext, n: usize) -> i32 {
    if quant.alternate_scan {
        63
    } else {
        last_index(quant, n)
    }
}

/// MPEG-1 Intra 反量化
///
/// DC 乘以 DC scaler; AC: `(|level| * qscale * matrix) >> 3`, 再强制为奇数.
pub fn unquantize_mpeg1_intra(quant: &QuantContext, block: &mut Block, n: usize, qscale: i32) {
    let n_coeffs = last_index(quant, n);

    block[0] = (block[0] as i32 * quant.dc_scale(n)) as i16;
    let matrix = &quant.intra_matrix;
    for i in 1..=n_coeffs.min(63) as usize {
        let j = quant.intra_scantable.permutated[i] as usize;
        let level = block[j] as i32;
        if level == 0 {
            continue;
        }
        let abs = (level.abs() * qscale * matrix[j] as i32) >> 3;
        let abs = (abs - 1) | 1;
        block[j] = if level < 0 { -abs } else { abs } as i16;
    }
}

/// MPEG-1 Inter 反量化
///
/// `((2 * |level| + 1) * qscale * matrix) >> 4`, 再强制为奇数. 无 DC 特例.
pub fn unquantize_mpeg1_inter(quant: &QuantContext, block: &mut Block, n: usize, qscale: i32) {
    let n_coeffs = last_index(quant, n);

    let matrix = &quant.inter_matrix;
    for i in 0..=n_coeffs.min(63) {
        let j = quant.intra_scantable.permutated[i as usize] as usize;
        let level = block[j] as i32;
        if level == 0 {
            continue;
        }
        let abs = (((level.abs() << 1) + 1) * qscale * matrix[j] as i32) >> 4;
        let abs = (abs - 1) | 1;
        block[j] = if level < 0 { -abs } else { abs } as i16;
    }
}

/// MPEG-2 Intra 反量化 (不含失配控制)
pub fn unquantize_mpeg2_intra(quant: &QuantContext, block: &mut Block, n: usize, qscale: i32) {
    let qscale = mpeg2_qscale(quant, qscale);
    let n_coeffs = mpeg2_last_index(quant, n);

    block[0] = (block[0] as i32 * quant.dc_scale(n)) as i16;
    let matrix = &quant.intra_matrix;
    for i in 1..=n_coeffs.min(63) as usize {
        let j = quant.intra_scantable.permutated[i] as usize;
        let level = block[j] as i32;
        if level == 0 {
            continue;
        }
        let abs = (level.abs() * qscale * matrix[j] as i32) >> 4;
        block[j] = if level < 0 { -abs } else { abs } as i16;
    }
}

/// MPEG-2 Intra 反量化, 严格模式
///
/// 在普通 MPEG-2 Intra 的基础上累加全部反量化结果 (含 DC, 初值 -1),
/// 并把和的奇偶位异或到第 64 个系数, 即标准规定的失配控制.
pub fn unquantize_mpeg2_intra_bitexact(
    quant: &QuantContext,
    block: &mut Block,
    n: usize,
    qscale: i32,
) {
    let qscale = mpeg2_qscale(quant, qscale);
    let n_coeffs = mpeg2_last_index(quant, n);
    let mut sum: i32 = -1;

    block[0] = (block[0] as i32 * quant.dc_scale(n)) as i16;
    sum += block[0] as i32;
    let matrix = &quant.intra_matrix;
    for i in 1..=n_coeffs.min(63) as usize {
        let j = quant.intra_scantable.permutated[i] as usize;
        let level = block[j] as i32;
        if level == 0 {
            continue;
        }
        let abs = (level.abs() * qscale * matrix[j] as i32) >> 4;
        let level = if level < 0 { -abs } else { abs };
        block[j] = level as i16;
        sum += level;
    }
    block[63] ^= (sum & 1) as i16;
}

/// MPEG-2 Inter 反量化 (含失配控制)
pub fn unquantize_mpeg2_inter(quant: &QuantContext, block: &mut Block, n: usize, qscale: i32) {
    let qscale = mpeg2_qscale(quant, qscale);
    let n_coeffs = mpeg2_last_index(quant, n);
    let mut sum: i32 = -1;

    let matrix = &quant.inter_matrix;
    for i in 0..=n_coeffs.min(63) {
        let j = quant.intra_scantable.permutated[i as usize] as usize;
        let level = block[j] as i32;
        if level == 0 {
            continue;
        }
        let abs = (((level.abs() << 1) + 1) * qscale * matrix[j] as i32) >> 5;
        let level = if level < 0 { -abs } else { abs };
        block[j] = level as i16;
        sum += level;
    }
    block[63] ^= (sum & 1) as i16;
}

/// H.263 Intra 反量化
///
/// `level * 2qscale ± qadd`; 启用 AIC 时 qadd 为 0 且 DC 不缩放.
/// 处理范围由扫描表的光栅上界决定, AC 预测时处理全部系数.
pub fn unquantize_h263_intra(quant: &QuantContext, block: &mut Block, n: usize, qscale: i32) {
    let qmul = qscale << 1;
    let qadd = if quant.h263_aic {
        0
    } else {
        block[0] = (block[0] as i32 * quant.dc_scale(n)) as i16;
        (qscale - 1) | 1
    };

    let n_coeffs = if quant.ac_pred {
        63
    } else {
        quant
            .intra_scantable
            .raster_bound(last_index(quant, n))
            .unwrap_or(0)
    };

    for coeff in block.iter_mut().take(n_coeffs + 1).skip(1) {
        let level = *coeff as i32;
        if level == 0 {
            continue;
        }
        *coeff = if level < 0 {
            level * qmul - qadd
        } else {
            level * qmul + qadd
        } as i16;
    }
}

/// H.263 Inter 反量化
///
/// `level * 2qscale ± ((qscale - 1) | 1)`, 处理范围由 inter 扫描表的光栅上界决定.
pub fn unquantize_h263_inter(quant: &QuantContext, block: &mut Block, n: usize, qscale: i32) {
    let Some(n_coeffs) = quant.inter_scantable.raster_bound(last_index(quant, n)) else {
        return;
    };
    let qadd = (qscale - 1) | 1;
    let qmul = qscale << 1;

    for coeff in block.iter_mut().take(n_coeffs + 1) {
        let level = *coeff as i32;
        if level == 0 {
            continue;
        }
        *coeff = if level < 0 {
            level * qmul - qadd
        } else {
            level * qmul + qadd
        } as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::super::scantable::IdctPermutation;
    use super::super::tables::{DEFAULT_INTRA_MATRIX, ZIGZAG_SCAN};
    use super::*;

    fn quant_for(codec_id: CodecId) -> QuantContext {
        QuantContext::new(IdctPermutation::None, codec_id)
    }

    /// 在扫描位置 `pos` 放置系数, 并更新块的 last_index
    fn place(quant: &mut QuantContext, block: &mut Block, n: usize, pos: usize, level: i16) {
        block[ZIGZAG_SCAN[pos] as usize] = level;
        quant.block_last_index[n] = quant.block_last_index[n].max(pos as i32);
    }

    #[test]
    fn test_resolve_variants() {
        let none = CodecFlags::empty();
        let exact = CodecFlags::BITEXACT;
        assert_eq!(Unquantizers::resolve(CodecId::Mpeg1Video, false, none).name, "mpeg1");
        assert_eq!(Unquantizers::resolve(CodecId::Mpeg2Video, false, none).name, "mpeg2");
        assert_eq!(
            Unquantizers::resolve(CodecId::Mpeg2Video, false, exact).name,
            "mpeg2_bitexact"
        );
        assert_eq!(Unquantizers::resolve(CodecId::Mpeg4, false, none).name, "h263");
        assert_eq!(Unquantizers::resolve(CodecId::Mpeg4, true, none).name, "mpeg2");
        assert_eq!(Unquantizers::resolve(CodecId::H261, false, none).name, "h263");
        assert_eq!(Unquantizers::resolve(CodecId::Wmv2, false, exact).name, "h263");
    }

    #[test]
    fn test_mpeg1_intra_odd_magnitude_and_sign() {
        let mut quant = quant_for(CodecId::Mpeg1Video);
        for qscale in 1..=31 {
            for m in [8u16, 16, 83, 128, 255] {
                quant.intra_matrix = [m; 64];
                for level in [-20i16, -3, -1, 1, 2, 5, 20] {
                    let mut block = [0i16; 64];
                    quant.block_last_index[0] = -1;
                    place(&mut quant, &mut block, 0, 5, level);
                    unquantize_mpeg1_intra(&quant, &mut block, 0, qscale);
                    let out = block[ZIGZAG_SCAN[5] as usize];
                    assert_eq!(out.signum(), level.signum(), "符号应保持");
                    assert_eq!(out.abs() % 2, 1, "幅值应为奇数: q={qscale}, m={m}");
                }
            }
        }
    }

    #[test]
    fn test_mpeg1_intra_values() {
        let mut quant = quant_for(CodecId::Mpeg1Video);
        let mut block = [0i16; 64];
        block[0] = 100;
        place(&mut quant, &mut block, 0, 1, 3);
        place(&mut quant, &mut block, 0, 2, -3);
        unquantize_mpeg1_intra(&quant, &mut block, 0, 4);

        assert_eq!(block[0], 800, "DC 乘以 DC scaler 8");
        // 光栅 1: 3 * 4 * 16 >> 3 = 24 → 23
        assert_eq!(block[1], 23);
        // 光栅 8: 3 * 4 * 16 >> 3 = 24 → -23
        assert_eq!(block[8], -23);
    }

    #[test]
    fn test_mpeg1_inter_values() {
        let mut quant = quant_for(CodecId::Mpeg1Video);
        let mut block = [0i16; 64];
        place(&mut quant, &mut block, 0, 0, 2);
        place(&mut quant, &mut block, 0, 3, -1);
        unquantize_mpeg1_inter(&quant, &mut block, 0, 8);

        // (2*2+1) * 8 * 16 >> 4 = 40 → 39
        assert_eq!(block[0], 39);
        // (2*1+1) * 8 * 16 >> 4 = 24 → -23
        assert_eq!(block[16], -23);
    }

    #[test]
    fn test_zero_coefficients_untouched() {
        let mut quant = quant_for(CodecId::Mpeg2Video);
        quant.block_last_index[4] = 63;
        let variants: [UnquantizeFn; 5] = [
            unquantize_mpeg1_intra,
            unquantize_mpeg1_inter,
            unquantize_mpeg2_intra,
            unquantize_h263_intra,
            unquantize_h263_inter,
        ];
        for f in variants {
            let mut block = [0i16; 64];
            f(&quant, &mut block, 4, 17);
            assert!(block.iter().all(|&c| c == 0));
        }
    }

    #[test]
    fn test_mpeg2_intra_linear_and_non_linear() {
        let mut quant = quant_for(CodecId::Mpeg2Video);
        let mut block = [0i16; 64];
        place(&mut quant, &mut block, 0, 1, 5);
        let mut linear = block;
        unquantize_mpeg2_intra(&quant, &mut linear, 0, 10);
        // 5 * 20 * 16 >> 4 = 100
        assert_eq!(linear[1], 100);

        quant.q_scale_type = true;
        let mut non_linear = block;
        unquantize_mpeg2_intra(&quant, &mut non_linear, 0, 10);
        // qscale 10 → 12: 5 * 12 * 16 >> 4 = 60
        assert_eq!(non_linear[1], 60);
    }

    #[test]
    fn test_mpeg2_alternate_scan_processes_all_coefficients() {
        let mut quant = quant_for(CodecId::Mpeg2Video);
        quant.block_last_index[0] = 0;
        let mut block = [0i16; 64];
        block[63] = 1;

        let mut plain = block;
        unquantize_mpeg2_intra(&quant, &mut plain, 0, 1);
        assert_eq!(plain[63], 1, "last_index=0 时不处理 AC");

        quant.alternate_scan = true;
        let mut alternate = block;
        unquantize_mpeg2_intra(&quant, &mut alternate, 0, 1);
        // 1 * 2 * 83 >> 4 = 10
        assert_eq!(alternate[63], 10);
    }

    #[test]
    fn test_mpeg2_intra_bitexact_parity() {
        let mut quant = quant_for(CodecId::Mpeg2Video);
        let cases: [&[(usize, i16)]; 4] = [
            &[(1, 1)],
            &[(1, 3), (2, -7), (9, 2)],
            &[(1, 1), (63, 1)],
            &[(5, -1), (20, 4), (40, 9)],
        ];
        for qscale in [1, 2, 7, 31] {
            for dc in [0i16, 1, 33, -4] {
                for case in cases {
                    let mut block = [0i16; 64];
                    quant.block_last_index[0] = -1;
                    block[0] = dc;
                    for &(pos, level) in case {
                        place(&mut quant, &mut block, 0, pos, level);
                    }
                    unquantize_mpeg2_intra_bitexact(&quant, &mut block, 0, qscale);
                    let sum: i32 = -1 + block.iter().map(|&c| c as i32).sum::<i32>();
                    assert_eq!(sum & 1, 0, "失配控制后累加和应为偶数");
                }
            }
        }
    }

    #[test]
    fn test_mpeg2_inter_mismatch_control() {
        let mut quant = quant_for(CodecId::Mpeg2Video);
        let mut block = [0i16; 64];
        place(&mut quant, &mut block, 0, 0, 1);
        unquantize_mpeg2_inter(&quant, &mut block, 0, 2);
        // (2+1) * 4 * 16 >> 5 = 6, sum = 5 为奇数 → block[63] ^= 1
        assert_eq!(block[0], 6);
        assert_eq!(block[63], 1);
    }

    #[test]
    fn test_h263_intra() {
        let mut quant = quant_for(CodecId::H263);
        let mut block = [0i16; 64];
        block[0] = 10;
        place(&mut quant, &mut block, 0, 2, 2);
        place(&mut quant, &mut block, 0, 1, -1);
        unquantize_h263_intra(&quant, &mut block, 0, 6);

        assert_eq!(block[0], 80);
        // qmul = 12, qadd = 5
        assert_eq!(block[8], 2 * 12 + 5);
        assert_eq!(block[1], -12 - 5);
    }

    #[test]
    fn test_h263_intra_aic() {
        let mut quant = quant_for(CodecId::H263p);
        quant.h263_aic = true;
        let mut block = [0i16; 64];
        block[0] = 10;
        place(&mut quant, &mut block, 0, 1, 3);
        unquantize_h263_intra(&quant, &mut block, 0, 6);
        assert_eq!(block[0], 10, "AIC 下 DC 不缩放");
        assert_eq!(block[1], 36, "AIC 下 qadd 为 0");
    }

    #[test]
    fn test_h263_bound_uses_raster_end() {
        let mut quant = quant_for(CodecId::H263);
        let mut block = [0i16; 64];
        // 扫描位置 3 → 光栅 16, 光栅上界为 16: 光栅 9 也应被处理, 光栅 17 不处理
        quant.block_last_index[0] = 3;
        block[9] = 1;
        block[17] = 1;
        unquantize_h263_inter(&quant, &mut block, 0, 2);
        assert_eq!(block[9], 2 * 2 + 1);
        assert_eq!(block[17], 1);
    }

    #[test]
    fn test_h263_intra_ac_pred_processes_all() {
        let mut quant = quant_for(CodecId::Mpeg4);
        quant.ac_pred = true;
        quant.block_last_index[0] = 0;
        let mut block = [0i16; 64];
        block[63] = -2;
        unquantize_h263_intra(&quant, &mut block, 0, 3);
        assert_eq!(block[63], -2 * 6 - 3);
    }

    #[test]
    fn test_h263_inter_empty_block_is_noop() {
        let quant = quant_for(CodecId::H263);
        let mut block = [0i16; 64];
        block[0] = 4;
        unquantize_h263_inter(&quant, &mut block, 0, 2);
        assert_eq!(block[0], 4);
    }

    #[test]
    fn test_chroma_block_uses_chroma_dc_scale() {
        let mut quant = quant_for(CodecId::Mpeg4);
        quant.set_qscale(31);
        let mut luma = [0i16; 64];
        luma[0] = 2;
        let mut chroma = luma;
        unquantize_h263_intra(&quant, &mut luma, 0, quant.qscale);
        unquantize_h263_intra(&quant, &mut chroma, 4, quant.chroma_qscale);
        assert_eq!(luma[0], 2 * 46);
        assert_eq!(chroma[0], 2 * 25);
    }

    #[test]
    fn test_default_matrix_loaded_in_raster_order() {
        let quant = quant_for(CodecId::Mpeg1Video);
        assert_eq!(quant.intra_matrix[63], DEFAULT_INTRA_MATRIX[63] as u16);
    }
}
