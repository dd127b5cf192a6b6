//! 编解码器标识符.
//!
//! 对标 FFmpeg 的 `AVCodecID`, 仅包含共享 MPEG 块编码核心的视频编解码器.

use std::fmt;

use mpegvid_core::MpvError;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// MPEG-1 Video
    Mpeg1Video,
    /// MPEG-2 Video
    Mpeg2Video,
    /// H.261
    H261,
    /// H.263 (baseline)
    H263,
    /// H.263+ / H.263v2
    H263p,
    /// Sorenson Spark (FLV1, H.263 变体)
    Flv1,
    /// RealVideo 1.0
    Rv10,
    /// RealVideo 2.0
    Rv20,
    /// MPEG-4 Part 2 (ASP)
    Mpeg4,
    /// Microsoft MPEG-4 v1
    Msmpeg4v1,
    /// Microsoft MPEG-4 v2
    Msmpeg4v2,
    /// Microsoft MPEG-4 v3 (DivX 3)
    Msmpeg4v3,
    /// Windows Media Video 7
    Wmv1,
    /// Windows Media Video 8
    Wmv2,
}

/// 码流的输出格式族, 决定宏块表布局与反量化族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// MPEG-1 / MPEG-2
    Mpeg1,
    /// H.261
    H261,
    /// H.263 族 (含 MPEG-4 Part 2、MSMPEG4、WMV1/2)
    H263,
}

impl CodecId {
    /// 全部已知编解码器
    pub const ALL: [CodecId; 14] = [
        Self::Mpeg1Video,
        Self::Mpeg2Video,
        Self::H261,
        Self::H263,
        Self::H263p,
        Self::Flv1,
        Self::Rv10,
        Self::Rv20,
        Self::Mpeg4,
        Self::Msmpeg4v1,
        Self::Msmpeg4v2,
        Self::Msmpeg4v3,
        Self::Wmv1,
        Self::Wmv2,
    ];

    /// 获取输出格式族
    pub const fn output_format(&self) -> OutputFormat {
        match self {
            Self::Mpeg1Video | Self::Mpeg2Video => OutputFormat::Mpeg1,
            Self::H261 => OutputFormat::H261,
            _ => OutputFormat::H263,
        }
    }

    /// MSMPEG4 版本号 (v1/v2/v3 → 1/2/3, WMV1 → 4, WMV2 → 5, 其他 → 0)
    pub const fn msmpeg4_version(&self) -> u8 {
        match self {
            Self::Msmpeg4v1 => 1,
            Self::Msmpeg4v2 => 2,
            Self::Msmpeg4v3 => 3,
            Self::Wmv1 => 4,
            Self::Wmv2 => 5,
            _ => 0,
        }
    }

    /// 是否使用 H.263 风格的 DC/AC 预测
    pub const fn uses_h263_prediction(&self) -> bool {
        matches!(
            self,
            Self::Mpeg4
                | Self::Msmpeg4v1
                | Self::Msmpeg4v2
                | Self::Msmpeg4v3
                | Self::Wmv1
                | Self::Wmv2
        )
    }

    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mpeg1Video => "mpeg1video",
            Self::Mpeg2Video => "mpeg2video",
            Self::H261 => "h261",
            Self::H263 => "h263",
            Self::H263p => "h263p",
            Self::Flv1 => "flv1",
            Self::Rv10 => "rv10",
            Self::Rv20 => "rv20",
            Self::Mpeg4 => "mpeg4",
            Self::Msmpeg4v1 => "msmpeg4v1",
            Self::Msmpeg4v2 => "msmpeg4v2",
            Self::Msmpeg4v3 => "msmpeg4v3",
            Self::Wmv1 => "wmv1",
            Self::Wmv2 => "wmv2",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for CodecId {
    type Err = MpvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| MpvError::InvalidArgument(format!("未知编解码器: {s}")))
    }
}
