//! 编解码器标志与 FourCC.
//!
//! 对标 FFmpeg 的 `AV_CODEC_FLAG_*` 与 `codec_tag`.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 会话级编解码标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CodecFlags: u32 {
        /// 严格复现参考实现的输出 (启用 MPEG-2 intra 失配控制)
        const BITEXACT       = 1 << 0;
        /// 隔行运动估计 (需要场 MV 表)
        const INTERLACED_ME  = 1 << 1;
    }
}

/// FourCC 编解码器标签 (小端序打包, 与 `AV_RL32` 一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCc(pub u32);

impl FourCc {
    /// 交换了 U/V 平面顺序的 MPEG-2 变体
    pub const VCR2: FourCc = FourCc::new(*b"VCR2");

    /// 由 4 个字节构造
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// 由字符串构造, 长度必须为 4
    pub fn parse(tag: &str) -> Option<Self> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().ok()?;
        Some(Self::new(bytes))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.to_le_bytes() {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
