use serde::Serialize;

use crate::chunk::{ChunkDescriptor, plan_chunks};
use crate::volume::{Atom, VolumeRecord};

/// cube 数据的摘要，用于输出 JSON
#[derive(Debug, Clone, Serialize)]
pub struct VolumeReport {
    pub file: Option<String>,
    pub header: String,
    pub shape: [usize; 3],
    pub data_length: usize,
    pub atom_count: usize,
    pub origin: [f64; 3],
    pub scale: [f64; 3],
    pub unit_conversion: [f64; 3],
    pub max_abs_value: f64,
    pub atoms: Vec<Atom>,
    /// 仅在指定分块大小时输出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<ChunkDescriptor>,
}

impl VolumeReport {
    pub fn new(record: &VolumeRecord, chunk_size: Option<usize>) -> Self {
        let data_length = record.voxel_total();
        let chunk_size = chunk_size.map(|size| size.max(1));
        let chunks = chunk_size
            .map(|size| plan_chunks(data_length, size))
            .unwrap_or_default();

        Self {
            file: record.filename().map(|path| path.display().to_string()),
            header: record.header().to_string(),
            shape: record.voxel_count(),
            data_length,
            atom_count: record.atom_count(),
            origin: record.origin(),
            scale: record.scale(),
            unit_conversion: record.unit_conversion(),
            max_abs_value: record.max_voxel_val(),
            atoms: record.atoms().to_vec(),
            chunk_size,
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "title\nsubtitle\n1 0.0 0.0 0.0\n\
        -1 1.0 0.0 0.0\n-2 0.0 1.0 0.0\n-3 0.0 0.0 1.0\n\
        6 0.0 1.0 2.0 3.0\n\
        1 2 3\n4 5 -6\n";

    #[test]
    fn report_without_chunks_omits_chunk_fields() {
        let record = VolumeRecord::from_source(SMALL).unwrap();
        let json = serde_json::to_value(VolumeReport::new(&record, None)).unwrap();
        assert_eq!(json["shape"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["data_length"], 6);
        assert_eq!(json["atom_count"], 1);
        assert_eq!(json["max_abs_value"], 6.0);
        assert_eq!(json["file"], serde_json::Value::Null);
        assert_eq!(json["atoms"][0]["element"], 6);
        assert_eq!(json["atoms"][0]["xyz"], serde_json::json!([1.0, 2.0, 3.0]));
        assert!(json.get("chunk_size").is_none());
        assert!(json.get("chunks").is_none());
    }

    #[test]
    fn report_with_chunks_lists_plan() {
        let record = VolumeRecord::from_source(SMALL).unwrap();
        let report = VolumeReport::new(&record, Some(4));
        assert_eq!(report.chunk_size, Some(4));
        assert_eq!(
            report.chunks,
            vec![
                ChunkDescriptor {
                    index: 0,
                    start: 0,
                    end: 4
                },
                ChunkDescriptor {
                    index: 1,
                    start: 4,
                    end: 6
                },
            ]
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["chunks"][1]["end"], 6);
    }
}
