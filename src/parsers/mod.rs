pub mod cube;

pub use cube::parse_lines;
