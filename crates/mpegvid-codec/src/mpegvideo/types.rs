//! 编码上下文的类型定义: 线程模式, 图像结构, 创建选项, 帧几何, 图像级状态.

use mpegvid_core::{MpvError, MpvResult, PixelFormat, imgutils};

use super::scantable::IdctPermutation;
use crate::codec_id::CodecId;
use crate::flags::{CodecFlags, FourCc};

/// 切片上下文数量上限
pub const MAX_SLICE_CONTEXTS: usize = 32;

/// 运动估计 map 的项数 (另有同样大小的 score map)
pub const ME_MAP_SIZE: usize = 64;

/// 线程模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threading {
    /// 单线程, 只有主上下文
    #[default]
    Single,
    /// 按宏块行切片并行, 参数为请求的切片数
    Slice(usize),
}

impl Threading {
    /// 请求的切片数 (单线程为 1)
    pub const fn requested_slices(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Slice(n) => *n,
        }
    }
}

/// 图像结构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PictureStructure {
    /// 顶场
    TopField,
    /// 底场
    BottomField,
    /// 帧图像
    #[default]
    Frame,
}

impl PictureStructure {
    /// 是否为场图像
    pub const fn is_field(&self) -> bool {
        !matches!(self, Self::Frame)
    }
}

/// 创建上下文时的会话参数
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextOptions {
    /// 像素格式, 必须在 `initialize` 前设置
    pub pixel_format: PixelFormat,
    /// 编解码标志
    pub flags: CodecFlags,
    /// FourCC 标签
    pub codec_tag: FourCc,
    /// 原始采样位深, 0 表示取像素格式的位深
    pub bits_per_raw_sample: u32,
    /// 低分辨率解码级别 (0..=3)
    pub lowres: u32,
    /// 编码器模式
    pub encoding: bool,
    /// 编码器切片数覆盖
    pub slices: Option<usize>,
    /// 编码器降噪 (需要 DCT 误差累加表)
    pub noise_reduction: bool,
    /// 目标 IDCT 的系数排列
    pub idct_permutation: IdctPermutation,
    /// 单次分配的字节上限
    pub max_alloc: Option<usize>,
}

impl ContextOptions {
    /// 解码器默认参数
    pub fn decoder(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            ..Default::default()
        }
    }

    /// 编码器默认参数
    pub fn encoder(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            encoding: true,
            ..Default::default()
        }
    }

    /// 生效的采样位深
    pub fn effective_bits_per_sample(&self) -> u32 {
        if self.bits_per_raw_sample > 0 {
            self.bits_per_raw_sample
        } else {
            self.pixel_format.bits_per_component()
        }
    }

    /// 校验与帧尺寸无关的选项
    pub fn validate(&self) -> MpvResult<()> {
        if self.lowres > 3 {
            return Err(MpvError::InvalidArgument(format!(
                "lowres 必须在 0..=3, 实际为 {}",
                self.lowres
            )));
        }
        if self.slices == Some(0) {
            return Err(MpvError::InvalidArgument("slices 不能为 0".into()));
        }
        Ok(())
    }
}

/// 帧几何参数 (由宽高和编解码器推导)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    /// 像素宽度
    pub width: usize,
    /// 像素高度
    pub height: usize,
    /// 每行宏块数
    pub mb_width: usize,
    /// 宏块行数
    pub mb_height: usize,
    /// 宏块表行跨度 (多一列作为左边界)
    pub mb_stride: usize,
    /// 8x8 块表行跨度
    pub b8_stride: usize,
    /// 宏块总数
    pub mb_num: usize,
    /// `mb_height * mb_stride`
    pub mb_array_size: usize,
    /// 水平边缘位置
    pub h_edge_pos: usize,
    /// 垂直边缘位置
    pub v_edge_pos: usize,
    /// 6 个块的预测表跨度: 亮度为 b8_stride, 色度为 mb_stride
    pub block_wrap: [usize; 6],
    /// 色度水平子采样 (log2)
    pub chroma_x_shift: u32,
    /// 色度垂直子采样 (log2)
    pub chroma_y_shift: u32,
}

impl Geometry {
    /// 由帧尺寸推导宏块几何
    ///
    /// 隔行 MPEG-2 序列的宏块行数按场对齐: `ceil(h / 32) * 2`.
    pub fn compute(
        width: i32,
        height: i32,
        codec_id: CodecId,
        progressive_sequence: bool,
        pixel_format: PixelFormat,
    ) -> MpvResult<Self> {
        imgutils::check_image_size(width, height)?;
        let (chroma_x_shift, chroma_y_shift) = pixel_format.chroma_shift()?;
        let (width, height) = (width as usize, height as usize);

        let mb_height = if codec_id == CodecId::Mpeg2Video && !progressive_sequence {
            height.div_ceil(32) * 2
        } else {
            height.div_ceil(16)
        };
        let mb_width = width.div_ceil(16);
        let mb_stride = mb_width + 1;
        let b8_stride = mb_width * 2 + 1;

        Ok(Self {
            width,
            height,
            mb_width,
            mb_height,
            mb_stride,
            b8_stride,
            mb_num: mb_width * mb_height,
            mb_array_size: mb_height * mb_stride,
            h_edge_pos: mb_width * 16,
            v_edge_pos: mb_height * 16,
            block_wrap: [b8_stride, b8_stride, b8_stride, b8_stride, mb_stride, mb_stride],
            chroma_x_shift,
            chroma_y_shift,
        })
    }

    /// 亮度预测表大小: `b8_stride * (2 * mb_height + 1)`
    pub const fn y_size(&self) -> usize {
        self.b8_stride * (2 * self.mb_height + 1)
    }

    /// 单个色度预测表大小: `mb_stride * (mb_height + 1)`
    pub const fn c_size(&self) -> usize {
        self.mb_stride * (self.mb_height + 1)
    }

    /// 三平面预测表总大小, 宏块行数为奇数时多留一行
    pub const fn yc_size(&self) -> usize {
        let mut size = self.y_size() + 2 * self.c_size();
        if self.mb_height & 1 == 1 {
            size += 2 * self.b8_stride + 2 * self.mb_stride;
        }
        size
    }

    /// 场 MV 表大小: `(mb_height + 2) * mb_stride + 1`
    pub const fn mv_table_size(&self) -> usize {
        (self.mb_height + 2) * self.mb_stride + 1
    }

    /// 三平面预测表的起点偏移 (亮度, Cb, Cr)
    pub const fn plane_biases(&self) -> [usize; 3] {
        let cb = self.y_size() + self.mb_stride + 1;
        [self.b8_stride + 1, cb, cb + self.c_size()]
    }

    /// 宏块坐标 → 宏块表下标
    #[inline]
    pub const fn mb_xy(&self, mb_x: usize, mb_y: usize) -> usize {
        mb_x + mb_y * self.mb_stride
    }
}

/// 图像级状态 (由上层逐帧/逐宏块设置, 切片合并时整体复制)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureState {
    /// 图像结构
    pub picture_structure: PictureStructure,
    /// 逐行序列
    pub progressive_sequence: bool,
    /// 逐行帧
    pub progressive_frame: bool,
    /// 亮度行跨度 (字节, 可为负)
    pub linesize: isize,
    /// 色度行跨度 (字节, 可为负)
    pub uvlinesize: isize,
    /// 当前宏块列
    pub mb_x: usize,
    /// 当前宏块行
    pub mb_y: usize,
    /// 当前宏块 6 个块在预测表中的绝对下标
    pub block_index: [usize; 6],
    /// 当前宏块在三个平面中的字节偏移
    pub dest: [isize; 3],
}

impl Default for PictureState {
    fn default() -> Self {
        Self {
            picture_structure: PictureStructure::Frame,
            progressive_sequence: true,
            progressive_frame: true,
            linesize: 0,
            uvlinesize: 0,
            mb_x: 0,
            mb_y: 0,
            block_index: [0; 6],
            dest: [0; 3],
        }
    }
}

/// 编码统计 (各切片各自累加, 合并时复制)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceStatistics {
    /// 运动向量比特数
    pub mv_bits: u64,
    /// I 宏块纹理比特数
    pub i_tex_bits: u64,
    /// P 宏块纹理比特数
    pub p_tex_bits: u64,
    /// 其他比特数
    pub misc_bits: u64,
    /// Intra 宏块数
    pub i_count: u64,
    /// 跳过宏块数
    pub skip_count: u64,
}
