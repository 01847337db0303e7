use byteorder::{LittleEndian, WriteBytesExt};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkDescriptor {
    pub index: usize,
    /// 开始位置（包含），单位：浮点元素索引
    pub start: usize,
    /// 结束位置（不包含），单位：浮点元素索引
    pub end: usize,
}

impl ChunkDescriptor {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 根据元素总数按照 chunk_size 划分连续分块
/// 分块大小至少为 1，避免除零或无效分块
pub fn plan_chunks(data_length: usize, chunk_size: usize) -> Vec<ChunkDescriptor> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(data_length.div_ceil(chunk_size));
    let mut start = 0usize;
    let mut index = 0usize;
    while start < data_length {
        let end = (start + chunk_size).min(data_length);
        chunks.push(ChunkDescriptor { index, start, end });
        start = end;
        index += 1;
    }
    chunks
}

/// 将 chunk 数据序列化为小端 f64 二进制格式
pub fn encode_chunk(values: &[f64]) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(values));
    for value in values {
        bytes.write_f64::<LittleEndian>(*value)?;
    }
    Ok(bytes)
}
