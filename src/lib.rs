//! Gaussian cube 体积数据文件读取库
//!
//! 解析 cube 文件的头部、原子列表与体素数据，并统一换算为埃:
//!
//! ```
//! use cubefile::VolumeRecord;
//!
//! let text = "title\ncomment\n\
//!             0 0.0 0.0 0.0\n\
//!             -2 0.5 0.0 0.0\n\
//!             -2 0.0 0.5 0.0\n\
//!             -1 0.0 0.0 0.5\n\
//!             0.1 0.2 -0.3 0.4\n";
//!
//! let record = VolumeRecord::from_source(text)?;
//! assert_eq!(record.voxel_count(), [2, 2, 1]);
//! assert_eq!(record.max_voxel_val(), 0.4);
//! # Ok::<(), cubefile::Error>(())
//! ```

pub mod chunk;
pub mod error;
pub mod parsers;
pub mod report;
pub mod source;
pub mod units;
pub mod volume;
pub mod voxel_grid;

pub use chunk::{ChunkDescriptor, encode_chunk, plan_chunks};
pub use error::{Error, ParseError, SourceError};
pub use parsers::parse_lines;
pub use report::VolumeReport;
pub use source::{LineStream, Source};
pub use units::{BOHR_TO_ANGSTROM, LengthUnit};
pub use volume::{Atom, VolumeRecord};
pub use voxel_grid::VoxelGrid;
