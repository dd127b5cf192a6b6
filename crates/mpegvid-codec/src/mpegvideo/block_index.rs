//! 宏块索引: 当前宏块在预测表中的块下标与在图像平面中的字节偏移.

use mpegvid_core::{MpvError, MpvResult};

use super::context::MpegVideoContext;
use super::storage::DC_PRED_RESET;
use super::types::PictureStructure;
use crate::codec_id::OutputFormat;

impl MpegVideoContext {
    /// 宏块宽度与高度的 log2 (已计入 lowres 与高位深)
    fn mb_size_log2(&self) -> (u32, u32) {
        let options = &self.config.options;
        let high_depth = u32::from(options.effective_bits_per_sample() > 8);
        (4 + high_depth - options.lowres, 4 - options.lowres)
    }

    /// 计算宏块 `(mb_x, mb_y)` 的块下标与平面偏移
    ///
    /// `block_index[0..4]` 为 4 个亮度块在亮度预测表中的下标, `block_index[4..6]`
    /// 为 Cb/Cr 在色度预测表中的下标, 都是表内绝对下标.
    /// 场图像的行号按场计算, 宏块行奇偶必须与场极性一致.
    pub fn compute_block_indices(&mut self, mb_x: usize, mb_y: usize) -> MpvResult<()> {
        let g = &self.geometry;
        if mb_x >= g.mb_width || mb_y >= g.mb_height {
            return Err(MpvError::InvalidArgument(format!(
                "宏块坐标 ({mb_x}, {mb_y}) 超出 {}x{}",
                g.mb_width, g.mb_height
            )));
        }

        let structure = self.picture.picture_structure;
        if structure.is_field() {
            let bottom_field = structure == PictureStructure::BottomField;
            if (mb_y & 1 == 1) != bottom_field {
                return Err(MpvError::InconsistentFieldParity { mb_y, bottom_field });
            }
        }

        let b8 = g.b8_stride;
        let luma = b8 + 1 + b8 * 2 * mb_y + 2 * mb_x;
        let [_, cb_bias, cr_bias] = g.plane_biases();
        let chroma = g.mb_xy(mb_x, mb_y);
        let (x_shift, y_shift) = (g.chroma_x_shift, g.chroma_y_shift);

        self.picture.block_index = [
            luma,
            luma + 1,
            luma + b8,
            luma + b8 + 1,
            cb_bias + chroma,
            cr_bias + chroma,
        ];

        let (w, h) = self.mb_size_log2();
        let row = (if structure.is_field() { mb_y >> 1 } else { mb_y }) as isize;
        let col = mb_x as isize;
        let linesize = self.picture.linesize;
        let uvlinesize = self.picture.uvlinesize;
        let uv = (col << (w - x_shift)) + ((row * uvlinesize) << (h - y_shift));
        self.picture.dest = [(col << w) + ((row * linesize) << h), uv, uv];

        self.picture.mb_x = mb_x;
        self.picture.mb_y = mb_y;
        Ok(())
    }

    /// 前进到同一行的下一个宏块
    pub fn advance_block_index(&mut self) {
        let (w, _) = self.mb_size_log2();
        let x_shift = self.geometry.chroma_x_shift;
        let picture = &mut self.picture;

        picture.mb_x += 1;
        for idx in &mut picture.block_index[..4] {
            *idx += 2;
        }
        for idx in &mut picture.block_index[4..] {
            *idx += 1;
        }
        picture.dest[0] += 1isize << w;
        picture.dest[1] += 1isize << (w - x_shift);
        picture.dest[2] += 1isize << (w - x_shift);
    }

    /// 当前宏块按非 Intra 处理后, 复位其预测值
    ///
    /// DC 预测复位为 1024, H.263 族的 AC 预测清零, MSMPEG4 v3 以上同时清除编码块标志,
    /// 并把宏块标记为非 Intra. 所需的表未分配 (如不做 DC 预测的编码器) 时返回 `MissingTable`.
    pub fn clean_intra_table_entries(&mut self) -> MpvResult<()> {
        let wrap = self.geometry.b8_stride;
        let [xy, _, _, _, cb, cr] = self.picture.block_index;
        let luma = [xy, xy + 1, xy + wrap, xy + 1 + wrap];

        for idx in luma.into_iter().chain([cb, cr]) {
            self.tables.dc_val.set(idx, DC_PRED_RESET)?;
        }

        if self.config.out_format == OutputFormat::H263 {
            for idx in luma.into_iter().chain([cb, cr]) {
                self.scratch.ac_val.set(idx, [0; 16])?;
            }
        }

        if self.config.msmpeg4_version >= 3 {
            for idx in luma {
                self.tables.set_coded_block(idx, false)?;
            }
        }

        let mb_xy = self.geometry.mb_xy(self.picture.mb_x, self.picture.mb_y);
        self.tables.set_mb_intra(mb_xy, false)
    }
}
