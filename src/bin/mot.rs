// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 图片序列多目标跟踪 (Multi-Object Tracking)
///
/// 系统架构:
/// 1. 读帧线程: 按文件名顺序读取图片 (独立工作线程)
/// 2. 主线程:   运动检测 → 关联 → KCF 跟踪 → 绘制输出
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kcf_mot::input::{spawn_reader, ImageSequence};
use kcf_mot::renderer::{annotate, RenderOptions};
use kcf_mot::{gen_time_string, FrameResult, MotConfig, MotPipeline};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// 多目标跟踪参数
#[derive(Parser, Debug)]
#[command(author, version, about = "运动检测 + KCF 多目标跟踪", long_about = None)]
struct Args {
    /// 图片序列目录
    input: PathBuf,

    /// 配置文件 (不存在时写入默认配置)
    #[arg(short, long, default_value = "mot_config.json")]
    config: PathBuf,

    /// 输出根目录 (每次运行创建一个带时间戳的子目录)
    #[arg(short, long, default_value = "runs/mot")]
    output: PathBuf,

    /// 最多处理多少帧
    #[arg(short = 'n', long)]
    max_frames: Option<usize>,

    /// 不绘制检测框
    #[arg(long, default_value_t = false)]
    hide_detections: bool,

    /// 不保存结果图片
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// 读帧队列长度
    #[arg(long, default_value_t = 8)]
    queue: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    info!("🚀 多目标跟踪启动");

    let config = MotConfig::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config.display()))?;
    config.log_summary();

    let mut sequence = ImageSequence::open(&args.input)
        .with_context(|| format!("打开图片序列失败: {}", args.input.display()))?;
    if let Some(n) = args.max_frames {
        sequence = sequence.limit(n);
    }
    let total = sequence.len();

    // ========== 启动读帧线程 ==========
    let (rx, reader) = spawn_reader(sequence, args.queue);

    let first = rx.recv().context("图片序列没有可用帧")??;
    let mut pipeline = MotPipeline::new(&first, &config)?;

    let run_dir = args.output.join(gen_time_string("-"));
    let options = RenderOptions {
        show_detections: !args.hide_detections,
        ..RenderOptions::default()
    };
    if !args.no_save {
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("创建输出目录失败: {}", run_dir.display()))?;
        info!("💾 输出目录: {}", run_dir.display());
        first
            .save(run_dir.join(frame_name(0)))
            .context("保存第一帧失败")?;
    }

    // ========== 主循环 ==========
    let mut processed = 1usize;
    let mut detection_cycles = 0usize;
    for item in rx.iter() {
        let frame = item?;
        let result: FrameResult = pipeline.process(&frame)?;
        processed += 1;
        if result.detections.is_some() {
            detection_cycles += 1;
        }

        if !args.no_save {
            let canvas = annotate(&frame, &result, &options);
            let path = run_dir.join(frame_name(result.frame_index));
            canvas
                .save(&path)
                .with_context(|| format!("保存失败: {}", path.display()))?;
        }
    }

    reader.join().map_err(|_| anyhow!("读帧线程异常退出"))?;

    info!(
        "🏁 完成: {}/{} 帧 | 检测周期 {} | 累计跟踪ID {}",
        processed,
        total,
        detection_cycles,
        pipeline.associator().total_ids()
    );
    Ok(())
}

fn frame_name(index: u64) -> String {
    format!("{:06}.png", index)
}
