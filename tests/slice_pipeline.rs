//! 切片并行管线集成测试.
//!
//! 验证: 初始化 -> 切片并行遍历宏块 -> 反量化 -> 状态合并 -> 分辨率变更 全流程.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mpegvid::codec::{
    CodecId, ContextOptions, MpegVideoContext, PictureStructure, Threading, Unquantizers,
};
use mpegvid::core::{MpvError, PixelFormat};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open(codec_id: CodecId, width: i32, height: i32, threading: Threading) -> MpegVideoContext {
    let mut ctx = MpegVideoContext::new(ContextOptions::decoder(PixelFormat::Yuv420p));
    if let Err(err) = ctx.initialize(width, height, codec_id, threading) {
        panic!("初始化失败: {err}");
    }
    ctx
}

#[test]
fn test_slices_visit_every_macroblock_once() {
    init_logging();
    let mut ctx = open(CodecId::Mpeg4, 352, 288, Threading::Slice(5));
    let geometry = *ctx.geometry();
    assert_eq!(ctx.slice_context_count(), 5);

    let visits: Vec<AtomicUsize> = (0..geometry.mb_num).map(|_| AtomicUsize::new(0)).collect();
    let result = ctx.execute_slices(|slice| {
        let (start, end) = slice.row_range();
        for mb_y in start..end {
            slice.compute_block_indices(0, mb_y)?;
            for mb_x in 0..geometry.mb_width {
                if mb_x > 0 {
                    slice.advance_block_index();
                }
                assert_eq!(slice.picture.mb_x, mb_x);
                visits[mb_y * geometry.mb_width + mb_x].fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    });
    assert!(result.is_ok(), "切片执行失败: {:?}", result.err());
    assert!(
        visits.iter().all(|v| v.load(Ordering::Relaxed) == 1),
        "每个宏块应恰好被访问一次"
    );
}

#[test]
fn test_slices_dequantize_private_blocks() {
    init_logging();
    let mut ctx = open(CodecId::H263, 176, 144, Threading::Slice(3));
    assert_eq!(ctx.unquantizers().name, Unquantizers::H263.name);
    ctx.set_qscale(4);
    if let Err(err) = ctx.sync_slice_contexts() {
        panic!("同步切片上下文失败: {err}");
    }

    let results = Mutex::new(Vec::new());
    let result = ctx.execute_slices(|slice| {
        slice.quant.block_last_index[0] = 0;
        if let Some(block) = slice.scratch.block_mut(0) {
            block.fill(0);
            block[0] = 1;
        }
        slice.dequantize_inter(0)?;
        let value = slice.scratch.block(0).map(|b| b[0]);
        if let Ok(mut results) = results.lock() {
            results.push((slice.row_range(), value));
        }
        Ok(())
    });
    assert!(result.is_ok(), "切片执行失败: {:?}", result.err());

    let results = match results.into_inner() {
        Ok(results) => results,
        Err(err) => panic!("结果锁中毒: {err}"),
    };
    assert_eq!(results.len(), 3);
    // qscale=4: qmul=8, qadd=3
    for (range, value) in results {
        assert_eq!(value, Some(11), "切片 {range:?} 反量化结果错误");
    }
}

#[test]
fn test_slice_error_is_propagated() {
    init_logging();
    let mut ctx = open(CodecId::Mpeg1Video, 320, 240, Threading::Slice(4));
    let result = ctx.execute_slices(|slice| {
        let (start, _) = slice.row_range();
        if start > 0 {
            return Err(MpvError::InvalidArgument(format!("切片 {start} 失败")));
        }
        Ok(())
    });
    assert!(matches!(result, Err(MpvError::InvalidArgument(_))));
    assert_eq!(ctx.slice_contexts().len(), 3, "出错后切片上下文应保留");
}

#[test]
fn test_field_picture_pipeline() {
    init_logging();
    let mut options = ContextOptions::decoder(PixelFormat::Yuv420p);
    options.bits_per_raw_sample = 8;
    let mut ctx = MpegVideoContext::new(options);
    ctx.picture.progressive_sequence = false;
    if let Err(err) = ctx.initialize(720, 576, CodecId::Mpeg2Video, Threading::Single) {
        panic!("初始化失败: {err}");
    }
    ctx.picture.picture_structure = PictureStructure::BottomField;
    ctx.picture.linesize = 768;
    ctx.picture.uvlinesize = 384;

    assert!(ctx.compute_block_indices(0, 2).is_err(), "偶数行与底场极性不符");
    assert!(ctx.compute_block_indices(0, 3).is_ok());
    // 场图像按场行号 (3 >> 1 = 1) 计算偏移
    assert_eq!(ctx.picture.dest[0], 768 * 16);
    assert_eq!(ctx.picture.dest[1], 384 * 8);
}

#[test]
fn test_resize_rebuilds_slices() {
    init_logging();
    let mut ctx = open(CodecId::Mpeg2Video, 720, 576, Threading::Slice(8));
    assert_eq!(ctx.slice_context_count(), 8);

    if let Err(err) = ctx.resize(176, 144) {
        panic!("分辨率变更失败: {err}");
    }
    let geometry = ctx.geometry();
    assert_eq!((geometry.mb_width, geometry.mb_height), (11, 9));
    assert_eq!(ctx.slice_context_count(), 8);

    let ranges = ctx.slice_ranges();
    assert_eq!(ranges.first().map(|r| r.0), Some(0));
    assert_eq!(ranges.last().map(|r| r.1), Some(9));
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "切片范围应连续");
    }
}

#[test]
fn test_teardown_then_reinitialize() {
    init_logging();
    let mut ctx = open(CodecId::Wmv2, 320, 240, Threading::Slice(2));
    ctx.teardown();
    assert!(!ctx.is_initialized());
    assert!(matches!(ctx.duplicate(2), Err(MpvError::NotInitialized)));

    if let Err(err) = ctx.initialize(640, 480, CodecId::Msmpeg4v3, Threading::Slice(2)) {
        panic!("重新初始化失败: {err}");
    }
    assert_eq!(ctx.config().msmpeg4_version, 3);
    assert_eq!(ctx.geometry().mb_width, 40);
}
