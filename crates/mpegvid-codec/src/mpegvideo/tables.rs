//! 常量表: 扫描顺序, DC scaler, 色度 qscale, 非线性 qscale, 默认量化矩阵.
//!
//! 全部为进程级只读常量, 无需初始化, 可在线程间自由共享.

/// 标准 Zigzag 扫描表 (扫描位置 → 光栅位置)
pub const ZIGZAG_SCAN: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, //
    17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, //
    27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, //
    29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, //
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// 交替水平扫描表 (AC 预测方向为垂直时使用)
pub const ALTERNATE_HORIZONTAL_SCAN: [u8; 64] = [
    0, 1, 2, 3, 8, 9, 16, 17, //
    10, 11, 4, 5, 6, 7, 15, 14, //
    13, 12, 19, 18, 24, 25, 32, 33, //
    26, 27, 20, 21, 22, 23, 28, 29, //
    30, 31, 34, 35, 40, 41, 48, 49, //
    42, 43, 36, 37, 38, 39, 44, 45, //
    46, 47, 50, 51, 56, 57, 58, 59, //
    52, 53, 54, 55, 60, 61, 62, 63,
];

/// 交替垂直扫描表 (隔行 MPEG-2 / MPEG-4 的 alternate_scan)
pub const ALTERNATE_VERTICAL_SCAN: [u8; 64] = [
    0, 8, 16, 24, 1, 9, 2, 10, //
    17, 25, 32, 40, 48, 56, 57, 49, //
    41, 33, 26, 18, 3, 11, 4, 12, //
    19, 27, 34, 42, 50, 58, 35, 43, //
    51, 59, 20, 28, 5, 13, 6, 14, //
    21, 29, 36, 44, 52, 60, 37, 45, //
    53, 61, 22, 30, 7, 15, 23, 31, //
    38, 46, 54, 62, 39, 47, 55, 63,
];

/// MPEG-1/2 默认 Intra 量化矩阵 (光栅顺序)
pub const DEFAULT_INTRA_MATRIX: [u8; 64] = [
    8, 16, 19, 22, 26, 27, 29, 34, //
    16, 16, 22, 24, 27, 29, 34, 37, //
    19, 22, 26, 27, 29, 34, 34, 38, //
    22, 22, 26, 27, 29, 34, 37, 40, //
    22, 26, 27, 29, 32, 35, 40, 48, //
    26, 27, 29, 32, 35, 40, 48, 58, //
    26, 27, 29, 34, 38, 46, 56, 69, //
    27, 29, 35, 38, 46, 56, 69, 83,
];

/// MPEG-1/2 默认 Inter 量化矩阵 (全部为 16)
pub const DEFAULT_INTER_MATRIX: [u8; 64] = [16; 64];

/// MPEG-2 非线性量化尺度 (q_scale_type = 1)
pub const MPEG2_NON_LINEAR_QSCALE: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, //
    8, 10, 12, 14, 16, 18, 20, 22, //
    24, 28, 32, 36, 40, 44, 48, 52, //
    56, 64, 72, 80, 88, 96, 104, 112,
];

/// MPEG-1 DC scaler (与 qscale 无关, 恒为 8)
pub const MPEG1_DC_SCALE: [u8; 32] = [8; 32];

/// MPEG-2 DC scaler, 按 intra_dc_precision (0..=3) 索引
pub static MPEG2_DC_SCALE: [[u8; 32]; 4] = [[8; 32], [4; 32], [2; 32], [1; 32]];

/// MPEG-4 亮度 DC scaler (ISO/IEC 14496-2 Table 7-1)
pub const MPEG4_Y_DC_SCALE: [u8; 32] = [
    0, 8, 8, 8, 8, 10, 12, 14, //
    16, 17, 18, 19, 20, 21, 22, 23, //
    24, 25, 26, 27, 28, 29, 30, 31, //
    32, 34, 36, 38, 40, 42, 44, 46,
];

/// MPEG-4 色度 DC scaler (ISO/IEC 14496-2 Table 7-1)
pub const MPEG4_C_DC_SCALE: [u8; 32] = [
    0, 8, 8, 8, 8, 9, 9, 10, //
    10, 11, 11, 12, 12, 13, 13, 14, //
    14, 15, 15, 16, 16, 17, 17, 18, //
    18, 19, 20, 21, 22, 23, 24, 25,
];

/// WMV1/WMV2 亮度 DC scaler
pub const WMV1_Y_DC_SCALE: [u8; 32] = [
    0, 8, 8, 8, 8, 8, 9, 9, //
    10, 10, 11, 11, 12, 12, 13, 13, //
    14, 14, 15, 15, 16, 16, 17, 17, //
    18, 18, 19, 19, 20, 20, 21, 21,
];

/// WMV1/WMV2 色度 DC scaler
pub const WMV1_C_DC_SCALE: [u8; 32] = [
    0, 8, 8, 8, 8, 9, 9, 10, //
    10, 11, 11, 12, 12, 13, 13, 14, //
    14, 15, 15, 16, 16, 17, 17, 18, //
    18, 19, 19, 20, 20, 21, 21, 22,
];

/// H.263 Advanced Intra Coding DC scaler (2 * qscale)
pub const AIC_DC_SCALE: [u8; 32] = [
    0, 2, 4, 6, 8, 10, 12, 14, //
    16, 18, 20, 22, 24, 26, 28, 30, //
    32, 34, 36, 38, 40, 42, 44, 46, //
    48, 50, 52, 54, 56, 58, 60, 62,
];

/// 默认色度 qscale (与亮度相同)
pub const DEFAULT_CHROMA_QSCALE: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, //
    8, 9, 10, 11, 12, 13, 14, 15, //
    16, 17, 18, 19, 20, 21, 22, 23, //
    24, 25, 26, 27, 28, 29, 30, 31,
];

/// H.263 Annex T 色度 qscale
pub const H263_CHROMA_QSCALE: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 6, //
    7, 8, 9, 9, 10, 10, 11, 11, //
    12, 12, 12, 13, 13, 13, 14, 14, //
    14, 14, 14, 15, 15, 15, 15, 15,
];
