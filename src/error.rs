use std::path::PathBuf;

use thiserror::Error;

/// 数据源解析阶段的错误（路径、文本、迭代器都无法使用）
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("不是可读取的文件: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("无法打开数据源: {0}")]
    Io(#[from] std::io::Error),
}

/// cube 文件格式错误
///
/// `line` 从 1 开始计数，对应出错的原始行号。
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("第 {line} 行: 文件提前结束，缺少{expected}")]
    UnexpectedEof { line: usize, expected: &'static str },

    #[error("第 {line} 行: 字段不足，缺少{expected}")]
    MissingToken { line: usize, expected: &'static str },

    #[error("第 {line} 行: {field} 不是有效整数: '{token}'")]
    InvalidInteger {
        line: usize,
        field: &'static str,
        token: String,
    },

    #[error("第 {line} 行: {field} 不是有效浮点数: '{token}'")]
    InvalidFloat {
        line: usize,
        field: &'static str,
        token: String,
    },

    #[error("第 {line} 行: 原子数为负 ({atom_count})，不支持多值 cube 变体")]
    UnsupportedVariant { line: usize, atom_count: i64 },

    #[error("体素不是轴对齐的长方体: {voxel_shape:?}")]
    NonSquareVoxels { voxel_shape: [[f64; 3]; 3] },

    #[error("网格维度溢出: {counts:?}")]
    GridTooLarge { counts: [u64; 3] },

    #[error("体素数量不匹配: shape {shape:?} 需要 {expected} 个元素，但提供了 {found} 个")]
    VoxelCount {
        shape: [usize; 3],
        expected: usize,
        found: usize,
    },

    #[error("第 {line} 行: 读取失败: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// 读取 cube 数据时对外暴露的统一错误类型
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("读取 cube 数据失败: {0}")]
    Parse(#[from] ParseError),
}
