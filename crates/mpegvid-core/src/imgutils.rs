//! 图像尺寸工具.

use crate::error::{MpvError, MpvResult};

/// 检查图像尺寸是否可安全用于缓冲区计算
///
/// 宽高必须为正, 且 `(w + 128) * (h + 128)` 小于 `i32::MAX / 8`,
/// 保证带边缘的平面尺寸在 32 位有符号算术中不溢出.
pub fn check_image_size(width: i32, height: i32) -> MpvResult<()> {
    if width <= 0 || height <= 0 {
        return Err(MpvError::InvalidGeometry(format!(
            "图像尺寸必须为正, width={width}, height={height}"
        )));
    }
    let padded = (width as i64 + 128) * (height as i64 + 128);
    if padded >= (i32::MAX / 8) as i64 {
        return Err(MpvError::InvalidGeometry(format!(
            "图像尺寸过大, width={width}, height={height}"
        )));
    }
    Ok(())
}

/// 向上对齐到 `align` 的倍数 (`align` 必须为 2 的幂)
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
