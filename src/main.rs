use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, error, info};

use cubefile::{Source, VolumeRecord, VolumeReport, encode_chunk};

#[derive(Parser)]
#[command(name = "cubefile", about = "读取 Gaussian cube 体积数据文件并输出摘要", version)]
struct Cli {
    /// cube 文件路径，`-` 表示标准输入，支持 .gz 压缩文件
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// 以 JSON 格式输出摘要
    #[arg(long)]
    json: bool,

    /// 分块大小（元素个数），指定后摘要中包含分块信息
    #[arg(long, value_name = "N")]
    chunk_size: Option<usize>,

    /// 把每个分块写成小端 f64 二进制文件
    #[arg(long, value_name = "DIR", requires = "chunk_size")]
    export_chunks: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,

    /// 输出全部日志
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Read(#[from] cubefile::Error),

    #[error("写入失败: {0}")]
    Io(#[from] io::Error),

    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    } else {
        let mut verbosity_level = LevelFilter::Info;
        if cli.verbose {
            verbosity_level = LevelFilter::Debug
        };
        if cli.trace {
            verbosity_level = LevelFilter::Trace
        };

        let mut builder = Builder::new();
        builder
            .filter_module("cubefile", verbosity_level)
            .format_target(false)
            .init();
    }

    let mut failures = 0usize;
    for path in &cli.files {
        if let Err(err) = run_file(&cli, path) {
            error!("{}: {err}", path.display());
            failures += 1;
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_file(cli: &Cli, path: &Path) -> Result<(), AppError> {
    let record = if path == Path::new("-") {
        VolumeRecord::from_source(Source::reader(io::stdin().lock()))?
    } else {
        VolumeRecord::from_source(path)?
    };

    let report = VolumeReport::new(&record, cli.chunk_size);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{record}");
    }

    if let Some(dir) = &cli.export_chunks {
        export_chunks(dir, path, &record, &report)?;
    }
    Ok(())
}

/// 按分块信息把体素数据写到 `<目录>/<文件名>.chunk<序号>.bin`
fn export_chunks(
    dir: &Path,
    path: &Path,
    record: &VolumeRecord,
    report: &VolumeReport,
) -> Result<(), AppError> {
    fs::create_dir_all(dir)?;
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| *stem != "-")
        .unwrap_or("stdin");

    for descriptor in &report.chunks {
        let Some(values) = record.voxels().chunk(descriptor) else {
            continue;
        };
        let bytes = encode_chunk(values)?;
        fs::write(dir.join(format!("{stem}.chunk{}.bin", descriptor.index)), bytes)?;
    }

    info!(
        "已导出 {} 个分块到 {}",
        report.chunks.len(),
        dir.display()
    );
    Ok(())
}
