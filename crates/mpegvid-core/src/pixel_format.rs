//! 像素格式定义.
//!
//! 只描述块编码核心关心的平面 YUV / 灰度格式: 色度子采样与采样位深.

use std::fmt;

use crate::error::{MpvError, MpvResult};

/// 像素格式
///
/// 命名规则: 颜色空间 + 子采样 + P (Planar) + 位深/字节序.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    #[default]
    None,

    // ========================
    // YUV 平面格式 (Planar)
    // ========================
    /// YUV 4:2:0 平面格式, 8 位 (MPEG-1/2, H.263, MPEG-4 默认)
    Yuv420p,
    /// YUV 4:2:2 平面格式, 8 位 (MPEG-2 4:2:2 Profile)
    Yuv422p,
    /// YUV 4:4:4 平面格式, 8 位
    Yuv444p,
    /// YUV 4:2:0 平面格式, 全范围 (JPEG 色彩范围)
    Yuvj420p,
    /// YUV 4:2:0 平面格式, 10 位小端
    Yuv420p10le,
    /// YUV 4:2:2 平面格式, 10 位小端
    Yuv422p10le,

    // ========================
    // 灰度格式
    // ========================
    /// 灰度 8 位
    Gray8,
}

impl PixelFormat {
    /// 获取单个分量的位深
    pub const fn bits_per_component(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuvj420p | Self::Gray8 => 8,
            Self::Yuv420p10le | Self::Yuv422p10le => 10,
        }
    }

    /// 获取色度子采样 (log2 水平, log2 垂直)
    ///
    /// 像素格式未设置时返回 `InvalidGeometry`, 与 "先校验后分配" 的初始化顺序配合.
    pub fn chroma_shift(&self) -> MpvResult<(u32, u32)> {
        match self {
            Self::None => Err(MpvError::InvalidGeometry("像素格式未设置".into())),
            Self::Yuv420p | Self::Yuvj420p | Self::Yuv420p10le => Ok((1, 1)),
            Self::Yuv422p | Self::Yuv422p10le => Ok((1, 0)),
            Self::Yuv444p | Self::Gray8 => Ok((0, 0)),
        }
    }

    /// 平面数量 (灰度格式按 3 平面处理, 色度平面由外部填充中性值)
    pub const fn plane_count(&self) -> u32 {
        match self {
            Self::None => 0,
            _ => 3,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuvj420p => "yuvj420p",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Yuv422p10le => "yuv422p10le",
            Self::Gray8 => "gray8",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = MpvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yuv420p" => Ok(Self::Yuv420p),
            "yuv422p" => Ok(Self::Yuv422p),
            "yuv444p" => Ok(Self::Yuv444p),
            "yuvj420p" => Ok(Self::Yuvj420p),
            "yuv420p10le" => Ok(Self::Yuv420p10le),
            "yuv422p10le" => Ok(Self::Yuv422p10le),
            "gray8" => Ok(Self::Gray8),
            other => Err(MpvError::InvalidArgument(format!("未知像素格式: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chroma_shift() {
        assert_eq!(PixelFormat::Yuv420p.chroma_shift(), Ok((1, 1)));
        assert_eq!(PixelFormat::Yuv422p10le.chroma_shift(), Ok((1, 0)));
        assert_eq!(PixelFormat::Yuv444p.chroma_shift(), Ok((0, 0)));
    }

    #[test]
    fn test_none_is_invalid_geometry() {
        assert!(matches!(
            PixelFormat::None.chroma_shift(),
            Err(MpvError::InvalidGeometry(_))
        ));
        assert_eq!(PixelFormat::None.plane_count(), 0);
    }

    #[test]
    fn test_name_roundtrip() {
        for pf in [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv422p,
            PixelFormat::Yuvj420p,
            PixelFormat::Gray8,
        ] {
            assert_eq!(pf.to_string().parse::<PixelFormat>(), Ok(pf));
        }
        assert!("rgb24".parse::<PixelFormat>().is_err());
    }
}
