use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::error::Error;
use crate::parsers::cube::parse_lines;
use crate::source::Source;
use crate::voxel_grid::VoxelGrid;

/// 单个原子
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Atom {
    /// 原子序数
    pub element: i32,
    pub charge: f64,
    /// 坐标（埃）
    pub xyz: [f64; 3],
}

/// 解析后的 cube 文件
///
/// 读取失败时整体恢复为默认值，不会保留部分解析的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRecord {
    pub(crate) filename: Option<PathBuf>,
    pub(crate) header: String,
    pub(crate) origin: [f64; 3],
    pub(crate) voxel_shape: [[f64; 3]; 3],
    pub(crate) unit_conversion: [f64; 3],
    pub(crate) scale: [f64; 3],
    pub(crate) atoms: Vec<Atom>,
    pub(crate) voxels: VoxelGrid,
}

impl Default for VolumeRecord {
    fn default() -> Self {
        Self {
            filename: None,
            header: String::new(),
            origin: [0.0; 3],
            voxel_shape: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            unit_conversion: [1.0; 3],
            scale: [1.0; 3],
            atoms: Vec::new(),
            voxels: VoxelGrid::default(),
        }
    }
}

impl VolumeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从数据源直接构造
    pub fn from_source<'a>(source: impl Into<Source<'a>>) -> Result<Self, Error> {
        Self::load(source.into())
    }

    /// 重新读取数据源，替换当前内容
    ///
    /// 先解析到新的实例中，成功后才整体替换；失败时当前实例被重置为默认值。
    pub fn read<'a>(&mut self, source: impl Into<Source<'a>>) -> Result<(), Error> {
        match Self::load(source.into()) {
            Ok(record) => {
                *self = record;
                Ok(())
            }
            Err(err) => {
                warn!("读取 cube 数据失败，已重置: {err}");
                self.reset();
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn load(source: Source<'_>) -> Result<Self, Error> {
        let filename = source.path().map(Path::to_path_buf);
        let lines = source.open()?;
        let mut record = parse_lines(lines)?;

        if let Some(path) = &filename {
            info!(
                "已加载 {}: {} 个体素, {} 个原子",
                path.display(),
                record.voxel_total(),
                record.atom_count()
            );
        }
        record.filename = filename;
        Ok(record)
    }

    /// 数据来源的文件路径
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// 前两行注释，原样拼接
    pub fn header(&self) -> &str {
        &self.header
    }

    /// 坐标系原点（埃）
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// 每个轴的体素向量，保持文件中的原始单位
    pub fn voxel_shape(&self) -> [[f64; 3]; 3] {
        self.voxel_shape
    }

    /// 每个轴相对埃的换算系数
    pub fn unit_conversion(&self) -> [f64; 3] {
        self.unit_conversion
    }

    /// 每个轴的实际体素尺寸（埃）
    pub fn scale(&self) -> [f64; 3] {
        self.scale
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn voxels(&self) -> &VoxelGrid {
        &self.voxels
    }

    /// 每个维度的体素数
    pub fn voxel_count(&self) -> [usize; 3] {
        self.voxels.shape()
    }

    /// 体素总数
    pub fn voxel_total(&self) -> usize {
        self.voxels.len()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// 体素的最大绝对值
    pub fn max_voxel_val(&self) -> f64 {
        self.voxels.max_abs()
    }
}

impl fmt::Display for VolumeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [nx, ny, nz] = self.voxel_count();
        write!(f, "cube 数据，{nx}×{ny}×{nz} 个体素")?;
        if let Some(path) = &self.filename {
            write!(f, "，来自 {}", path.display())?;
        }
        write!(f, "。")
    }
}
