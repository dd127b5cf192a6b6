//! mpegvid 性能基准测试.
//!
//! 覆盖反量化热路径、宏块遍历与上下文初始化.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mpegvid::codec::mpegvideo::dequant::{Block, Unquantizers};
use mpegvid::codec::{CodecId, ContextOptions, IdctPermutation, MpegVideoContext, QuantContext, Threading};
use mpegvid::core::PixelFormat;

/// 构造一个较满的系数块 (交替正负, 末尾少量零)
fn make_block() -> Block {
    let mut block = [0i16; 64];
    for (i, coeff) in block.iter_mut().enumerate().take(48) {
        let v = (i % 7) as i16 + 1;
        *coeff = if i % 2 == 0 { v } else { -v };
    }
    block
}

fn make_quant(codec_id: CodecId) -> QuantContext {
    let mut quant = QuantContext::new(IdctPermutation::None, codec_id);
    quant.set_qscale(12);
    quant.block_last_index = [47; 12];
    quant
}

fn bench_unquantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("unquantize_intra");
    let variants = [
        (Unquantizers::MPEG1, CodecId::Mpeg1Video),
        (Unquantizers::MPEG2, CodecId::Mpeg2Video),
        (Unquantizers::MPEG2_BITEXACT, CodecId::Mpeg2Video),
        (Unquantizers::H263, CodecId::H263),
    ];
    for (unquantizers, codec_id) in variants {
        let quant = make_quant(codec_id);
        let source = make_block();
        group.bench_with_input(
            BenchmarkId::from_parameter(unquantizers.name),
            &source,
            |b, source| {
                b.iter(|| {
                    let mut block = *source;
                    (unquantizers.intra)(black_box(&quant), &mut block, 0, quant.qscale);
                    black_box(block)
                });
            },
        );
    }
    group.finish();
}

fn bench_block_index_walk(c: &mut Criterion) {
    let mut ctx = MpegVideoContext::new(ContextOptions::decoder(PixelFormat::Yuv420p));
    ctx.initialize(1920, 1088, CodecId::Mpeg4, Threading::Single)
        .unwrap();
    ctx.picture.linesize = 1984;
    ctx.picture.uvlinesize = 992;
    let (mb_width, mb_height) = (ctx.geometry().mb_width, ctx.geometry().mb_height);

    c.bench_function("block_index_walk_1080p", |b| {
        b.iter(|| {
            for mb_y in 0..mb_height {
                ctx.compute_block_indices(0, mb_y).unwrap();
                for _ in 1..mb_width {
                    ctx.advance_block_index();
                    ctx.clean_intra_table_entries().unwrap();
                }
            }
            black_box(ctx.picture.block_index)
        });
    });
}

fn bench_initialize(c: &mut Criterion) {
    c.bench_function("initialize_720p_8_slices", |b| {
        b.iter(|| {
            let mut ctx = MpegVideoContext::new(ContextOptions::decoder(PixelFormat::Yuv420p));
            ctx.initialize(1280, 720, CodecId::Mpeg2Video, Threading::Slice(8))
                .unwrap();
            black_box(ctx.slice_context_count())
        });
    });
}

criterion_group!(
    benches,
    bench_unquantize,
    bench_block_index_walk,
    bench_initialize
);
criterion_main!(benches);
