use crate::chunk::ChunkDescriptor;
use crate::error::ParseError;

/// 体素网格数据结构
/// 表示三维规则网格上的标量场数据
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoxelGrid {
    /// 网格维度 [nx, ny, nz]
    shape: [usize; 3],
    /// 数据数组，按 C 语言顺序存储 (z变化最快，y其次，x最慢)
    /// 索引计算: index = (i * ny + j) * nz + k
    data: Vec<f64>,
}

impl VoxelGrid {
    /// 创建新的体素网格，数据量必须与 shape 完全一致
    pub fn new(shape: [usize; 3], data: Vec<f64>) -> Result<Self, ParseError> {
        let total_elements = shape.iter().product::<usize>();

        if data.len() != total_elements {
            return Err(ParseError::VoxelCount {
                shape,
                expected: total_elements,
                found: data.len(),
            });
        }

        Ok(VoxelGrid { shape, data })
    }

    /// 获取 shape
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// 获取整个数据切片的引用
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 读取 (i, j, k) 处的值，越界返回 None
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f64> {
        let [nx, ny, nz] = self.shape;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        self.data.get((i * ny + j) * nz + k).copied()
    }

    /// 最大绝对值，空网格返回 0.0，含 NaN 时返回 NaN
    pub fn max_abs(&self) -> f64 {
        self.data
            .iter()
            .map(|v| v.abs())
            .fold(0.0_f64, |acc, v| if v.is_nan() || v > acc { v } else { acc })
    }

    /// 获取某个分块对应的数据切片
    pub fn chunk(&self, descriptor: &ChunkDescriptor) -> Option<&[f64]> {
        self.data.get(descriptor.start..descriptor.end)
    }
}
