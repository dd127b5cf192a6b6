//! 会话配置: 从 JSON 读取编解码器, 帧尺寸, 线程与上下文选项.
//!
//! ```json
//! {
//!     "codec": "mpeg2video",
//!     "width": 720,
//!     "height": 576,
//!     "threads": 4,
//!     "bitexact": true,
//!     "logging": { "level": "debug", "directory": "logs", "file_prefix": "mpegvid" }
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use mpegvid_codec::{
    CodecFlags, CodecId, ContextOptions, FourCc, IdctPermutation, MpegVideoContext, Threading,
};
use mpegvid_core::PixelFormat;

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// 编解码器名称, 如 `mpeg2video`, `h263`, `msmpeg4v3`
    pub codec: String,
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    #[serde(default)]
    pub encoding: bool,
    /// 切片线程数, 0 或 1 表示单线程
    #[serde(default)]
    pub threads: usize,
    /// 编码器切片数覆盖
    #[serde(default)]
    pub slices: Option<usize>,
    #[serde(default)]
    pub bitexact: bool,
    #[serde(default)]
    pub interlaced_me: bool,
    /// 4 字符 FourCC, 如 `VCR2`
    #[serde(default)]
    pub codec_tag: Option<String>,
    #[serde(default)]
    pub bits_per_raw_sample: u32,
    #[serde(default)]
    pub lowres: u32,
    #[serde(default)]
    pub noise_reduction: bool,
    #[serde(default = "default_idct_permutation")]
    pub idct_permutation: String,
    /// 单次分配字节上限
    #[serde(default)]
    pub max_alloc: Option<usize>,
    #[serde(default = "default_true")]
    pub progressive_sequence: bool,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_idct_permutation() -> String {
    "none".to_string()
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// 从 JSON 文件读取
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("解析配置文件失败, path={}", path.display()))
    }

    /// 从 JSON 文本读取
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("配置 JSON 格式错误")
    }

    pub fn codec_id(&self) -> Result<CodecId> {
        self.codec
            .parse()
            .with_context(|| format!("无效的 codec: {}", self.codec))
    }

    pub fn threading(&self) -> Threading {
        match self.threads {
            0 | 1 => Threading::Single,
            n => Threading::Slice(n),
        }
    }

    /// 转换为上下文创建选项
    pub fn context_options(&self) -> Result<ContextOptions> {
        let pixel_format: PixelFormat = self
            .pixel_format
            .parse()
            .with_context(|| format!("无效的 pixel_format: {}", self.pixel_format))?;
        let idct_permutation: IdctPermutation = self
            .idct_permutation
            .parse()
            .with_context(|| format!("无效的 idct_permutation: {}", self.idct_permutation))?;

        let codec_tag = match &self.codec_tag {
            Some(tag) => match FourCc::parse(tag) {
                Some(fourcc) => fourcc,
                None => bail!("codec_tag 必须为 4 个字节, 实际为 {:?}", tag),
            },
            None => FourCc::default(),
        };

        let mut flags = CodecFlags::empty();
        flags.set(CodecFlags::BITEXACT, self.bitexact);
        flags.set(CodecFlags::INTERLACED_ME, self.interlaced_me);

        let options = ContextOptions {
            pixel_format,
            flags,
            codec_tag,
            bits_per_raw_sample: self.bits_per_raw_sample,
            lowres: self.lowres,
            encoding: self.encoding,
            slices: self.slices,
            noise_reduction: self.noise_reduction,
            idct_permutation,
            max_alloc: self.max_alloc,
        };
        options.validate().context("上下文选项无效")?;
        Ok(options)
    }

    /// 创建并初始化编码上下文
    pub fn open_context(&self) -> Result<MpegVideoContext> {
        let codec_id = self.codec_id()?;
        let mut ctx = MpegVideoContext::new(self.context_options()?);
        ctx.picture.progressive_sequence = self.progressive_sequence;
        ctx.initialize(self.width, self.height, codec_id, self.threading())
            .with_context(|| {
                format!(
                    "初始化上下文失败, codec={}, size={}x{}",
                    codec_id, self.width, self.height
                )
            })?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SessionConfig {
        match SessionConfig::from_json(json) {
            Ok(config) => config,
            Err(err) => panic!("解析配置失败: {:#}", err),
        }
    }

    #[test]
    fn test_defaults() {
        let config = parse(r#"{ "codec": "mpeg1video", "width": 352, "height": 288 }"#);
        assert_eq!(config.pixel_format, "yuv420p");
        assert_eq!(config.idct_permutation, "none");
        assert!(config.progressive_sequence);
        assert!(!config.encoding);
        assert_eq!(config.threading(), Threading::Single);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_threading_mapping() {
        let mut config = parse(r#"{ "codec": "h263", "width": 176, "height": 144 }"#);
        config.threads = 1;
        assert_eq!(config.threading(), Threading::Single);
        config.threads = 6;
        assert_eq!(config.threading(), Threading::Slice(6));
    }

    #[test]
    fn test_context_options_flags_and_tag() {
        let config = parse(
            r#"{ "codec": "mpeg2video", "width": 720, "height": 576,
                 "bitexact": true, "codec_tag": "VCR2",
                 "idct_permutation": "transpose", "pixel_format": "yuv422p" }"#,
        );
        let options = match config.context_options() {
            Ok(options) => options,
            Err(err) => panic!("转换选项失败: {:#}", err),
        };
        assert!(options.flags.contains(CodecFlags::BITEXACT));
        assert!(!options.flags.contains(CodecFlags::INTERLACED_ME));
        assert_eq!(options.codec_tag, FourCc::VCR2);
        assert_eq!(options.idct_permutation, IdctPermutation::Transpose);
        assert_eq!(options.pixel_format, PixelFormat::Yuv422p);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = parse(r#"{ "codec": "mpeg4", "width": 64, "height": 64 }"#);
        config.codec = "vp9".to_string();
        assert!(config.codec_id().is_err(), "未知编解码器应报错");

        config.codec = "mpeg4".to_string();
        config.codec_tag = Some("VCR".to_string());
        assert!(config.context_options().is_err(), "FourCC 长度错误应报错");

        config.codec_tag = None;
        config.lowres = 4;
        assert!(config.context_options().is_err(), "lowres 超范围应报错");

        config.lowres = 0;
        config.pixel_format = "rgb24".to_string();
        assert!(config.context_options().is_err(), "未知像素格式应报错");
    }

    #[test]
    fn test_open_context() {
        let config = parse(r#"{ "codec": "mpeg4", "width": 352, "height": 288, "threads": 4 }"#);
        let ctx = match config.open_context() {
            Ok(ctx) => ctx,
            Err(err) => panic!("创建上下文失败: {:#}", err),
        };
        assert!(ctx.is_initialized());
        assert_eq!(ctx.geometry().mb_width, 22);
        assert_eq!(ctx.geometry().mb_height, 18);
        assert_eq!(ctx.slice_context_count(), 4);
    }

    #[test]
    fn test_open_context_interlaced_mpeg2() {
        let config = parse(
            r#"{ "codec": "mpeg2video", "width": 720, "height": 576, "progressive_sequence": false }"#,
        );
        let ctx = match config.open_context() {
            Ok(ctx) => ctx,
            Err(err) => panic!("创建上下文失败: {:#}", err),
        };
        assert_eq!(ctx.geometry().mb_height, 36);
    }

    #[test]
    fn test_open_context_reports_geometry_error() {
        let config = parse(r#"{ "codec": "mpeg1video", "width": 0, "height": 288 }"#);
        assert!(config.open_context().is_err());
    }
}
