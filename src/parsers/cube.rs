//! Gaussian cube 文件解析器
//!
//! 文件格式参考: <http://paulbourke.net/dataformats/cube/>
//!
//! ```text
//! 第 1-2 行   注释
//! 第 3 行     原子数  原点 x y z
//! 第 4-6 行   体素数  轴向量 x y z   (体素数为负表示单位为埃，否则为玻尔)
//! 之后        每个原子一行: 原子序数  电荷  x y z
//! 剩余部分    nx*ny*nz 个浮点数，按 C 顺序排列，换行位置任意
//! ```

use std::io;
use std::str::SplitWhitespace;

use log::debug;

use crate::error::ParseError;
use crate::units::LengthUnit;
use crate::volume::{Atom, VolumeRecord};
use crate::voxel_grid::VoxelGrid;

/// 预分配数组时的元素上限，超过后按需增长
const MAX_PREALLOCATED: usize = 1 << 24;

const AXIS_NAMES: [&str; 3] = ["x 轴定义", "y 轴定义", "z 轴定义"];

/// 从逐行数据中解析 cube 文件
///
/// 任何一步失败都会直接返回错误，不会产生部分填充的结果。
pub fn parse_lines<I>(lines: I) -> Result<VolumeRecord, ParseError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut reader = LineReader::new(lines.into_iter());

    // 第一阶段：按原始单位读取头部
    let raw = RawHeader::read(&mut reader)?;
    // 第二阶段：单位已知后统一换算并校验
    let geometry = raw.resolve()?;
    debug!(
        "cube 头部: {} 个原子, shape {:?}, 单位换算 {:?}",
        raw.atom_count, geometry.shape, geometry.unit_conversion
    );

    let atoms = read_atoms(&mut reader, raw.atom_count, geometry.unit_conversion)?;
    let voxels = read_voxels(&mut reader, geometry.shape)?;

    Ok(VolumeRecord {
        filename: None,
        header: raw.header,
        origin: geometry.origin,
        voxel_shape: geometry.voxel_shape,
        unit_conversion: geometry.unit_conversion,
        scale: geometry.scale,
        atoms,
        voxels,
    })
}

/// 带行号的逐行读取器
struct LineReader<I> {
    lines: I,
    line: usize,
}

impl<I> LineReader<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    fn new(lines: I) -> Self {
        Self { lines, line: 0 }
    }

    /// 读取下一行，文件结束时报告缺少的内容
    fn expect_line(&mut self, expected: &'static str) -> Result<String, ParseError> {
        self.next_line()?.ok_or(ParseError::UnexpectedEof {
            line: self.line + 1,
            expected,
        })
    }

    fn next_line(&mut self) -> Result<Option<String>, ParseError> {
        match self.lines.next() {
            None => Ok(None),
            Some(Ok(text)) => {
                self.line += 1;
                Ok(Some(text))
            }
            Some(Err(source)) => Err(ParseError::Io {
                line: self.line + 1,
                source,
            }),
        }
    }
}

/// 一行内按空白分隔的字段
struct Fields<'l> {
    line: usize,
    tokens: SplitWhitespace<'l>,
}

impl<'l> Fields<'l> {
    fn new(line: usize, text: &'l str) -> Self {
        Self {
            line,
            tokens: text.split_whitespace(),
        }
    }

    fn token(&mut self, field: &'static str) -> Result<&'l str, ParseError> {
        self.tokens.next().ok_or(ParseError::MissingToken {
            line: self.line,
            expected: field,
        })
    }

    fn integer(&mut self, field: &'static str) -> Result<i64, ParseError> {
        let token = self.token(field)?;
        token.parse().map_err(|_| ParseError::InvalidInteger {
            line: self.line,
            field,
            token: token.to_string(),
        })
    }

    fn float(&mut self, field: &'static str) -> Result<f64, ParseError> {
        parse_float(self.line, field, self.token(field)?)
    }

    fn vector(&mut self, field: &'static str) -> Result<[f64; 3], ParseError> {
        Ok([self.float(field)?, self.float(field)?, self.float(field)?])
    }
}

fn parse_float(line: usize, field: &'static str, token: &str) -> Result<f64, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidFloat {
        line,
        field,
        token: token.to_string(),
    })
}

/// 单个轴的原始定义
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisDefinition {
    count: u64,
    unit: LengthUnit,
    step: [f64; 3],
}

/// 未经单位换算的头部信息
#[derive(Debug, Clone, PartialEq)]
struct RawHeader {
    header: String,
    atom_count: usize,
    origin: [f64; 3],
    axes: [AxisDefinition; 3],
}

/// 单位换算与校验之后的几何信息
#[derive(Debug, Clone, PartialEq)]
struct Geometry {
    shape: [usize; 3],
    origin: [f64; 3],
    voxel_shape: [[f64; 3]; 3],
    unit_conversion: [f64; 3],
    scale: [f64; 3],
}

impl RawHeader {
    fn read<I>(reader: &mut LineReader<I>) -> Result<Self, ParseError>
    where
        I: Iterator<Item = io::Result<String>>,
    {
        // 第 1-2 行：注释，原样保留
        let first = reader.expect_line("注释行")?;
        let second = reader.expect_line("注释行")?;
        let header = format!("{first}\n{second}\n");

        // 第 3 行：原子数与原点
        let text = reader.expect_line("原子数与原点")?;
        let mut fields = Fields::new(reader.line, &text);
        let atom_count = fields.integer("原子数")?;
        let atom_count = usize::try_from(atom_count).map_err(|_| {
            ParseError::UnsupportedVariant {
                line: reader.line,
                atom_count,
            }
        })?;
        let origin = fields.vector("原点坐标")?;

        // 第 4-6 行：体素数、轴向量与单位
        let mut axes = [AxisDefinition {
            count: 0,
            unit: LengthUnit::Angstrom,
            step: [0.0; 3],
        }; 3];
        for (axis, name) in axes.iter_mut().zip(AXIS_NAMES) {
            let text = reader.expect_line(name)?;
            let mut fields = Fields::new(reader.line, &text);
            let count = fields.integer("体素数")?;
            *axis = AxisDefinition {
                count: count.unsigned_abs(),
                unit: LengthUnit::from_count_sign(count),
                step: fields.vector("轴向量")?,
            };
        }

        Ok(RawHeader {
            header,
            atom_count,
            origin,
            axes,
        })
    }

    /// 校验体素形状并把原点换算为埃
    fn resolve(&self) -> Result<Geometry, ParseError> {
        let voxel_shape = self.axes.map(|axis| axis.step);

        let off_diagonal = (0..3)
            .flat_map(|row| (0..3).map(move |col| (row, col)))
            .filter(|(row, col)| row != col)
            .any(|(row, col)| voxel_shape[row][col] != 0.0);
        if off_diagonal {
            return Err(ParseError::NonSquareVoxels { voxel_shape });
        }

        let unit_conversion = self.axes.map(|axis| axis.unit.to_angstrom());
        let counts = self.axes.map(|axis| axis.count);
        let shape = grid_shape(counts).ok_or(ParseError::GridTooLarge { counts })?;

        let origin = scale_by(self.origin, unit_conversion);
        let scale = std::array::from_fn(|i| norm(voxel_shape[i]) * unit_conversion[i]);

        Ok(Geometry {
            shape,
            origin,
            voxel_shape,
            unit_conversion,
            scale,
        })
    }
}

/// 各轴体素数转为 usize，且总数不能溢出
fn grid_shape(counts: [u64; 3]) -> Option<[usize; 3]> {
    let mut shape = [0usize; 3];
    for (dim, count) in shape.iter_mut().zip(counts) {
        *dim = usize::try_from(count).ok()?;
    }
    shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))?;
    Some(shape)
}

fn read_atoms<I>(
    reader: &mut LineReader<I>,
    atom_count: usize,
    unit_conversion: [f64; 3],
) -> Result<Vec<Atom>, ParseError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut atoms = Vec::with_capacity(atom_count.min(MAX_PREALLOCATED));
    for _ in 0..atom_count {
        let text = reader.expect_line("原子信息")?;
        let mut fields = Fields::new(reader.line, &text);
        let element = fields.integer("原子序数")?;
        let element = i32::try_from(element).map_err(|_| ParseError::InvalidInteger {
            line: reader.line,
            field: "原子序数",
            token: element.to_string(),
        })?;
        let charge = fields.float("电荷")?;
        let xyz = scale_by(fields.vector("原子坐标")?, unit_conversion);
        atoms.push(Atom {
            element,
            charge,
            xyz,
        });
    }
    Ok(atoms)
}

/// 剩余所有行视为一个连续的浮点数序列，数值可在任意行之间折行
///
/// 换行总是结束当前数值，跨行拆开的数字会被当作两个数值。
fn read_voxels<I>(reader: &mut LineReader<I>, shape: [usize; 3]) -> Result<VoxelGrid, ParseError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let expected: usize = shape.iter().product();
    let mut data = Vec::with_capacity(expected.min(MAX_PREALLOCATED));
    let mut found = 0usize;

    while let Some(text) = reader.next_line()? {
        for token in text.split_whitespace() {
            let value = parse_float(reader.line, "体素值", token)?;
            if found < expected {
                data.push(value);
            }
            found += 1;
        }
    }

    if found != expected {
        return Err(ParseError::VoxelCount {
            shape,
            expected,
            found,
        });
    }

    VoxelGrid::new(shape, data)
}

fn scale_by(vector: [f64; 3], factors: [f64; 3]) -> [f64; 3] {
    std::array::from_fn(|i| vector[i] * factors[i])
}

fn norm(vector: [f64; 3]) -> f64 {
    vector.iter().map(|v| v * v).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::BOHR_TO_ANGSTROM;
    use assert_float_eq::*;
    use rstest::{fixture, rstest};

    fn lines(text: &str) -> Vec<io::Result<String>> {
        text.lines().map(|line| Ok(line.to_string())).collect()
    }

    fn cube(axes: [&str; 3], atoms: &[&str], voxels: usize) -> String {
        let mut text = String::from("comment one\ncomment two\n");
        text.push_str(&format!("{} 1.0 2.0 3.0\n", atoms.len()));
        for axis in axes {
            text.push_str(axis);
            text.push('\n');
        }
        for atom in atoms {
            text.push_str(atom);
            text.push('\n');
        }
        let values: Vec<String> = (0..voxels).map(|v| format!("{v}.5")).collect();
        for row in values.chunks(6) {
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        text
    }

    /// 5×5×5 的网格，y 轴为埃，x 与 z 轴为玻尔
    #[fixture]
    fn mixed_axes() -> [&'static str; 3] {
        ["5 1.0 0.0 0.0", "-5 0.0 1.0 0.0", "5 0.0 0.0 1.0"]
    }

    #[rstest]
    fn parses_mixed_units(mixed_axes: [&'static str; 3]) {
        let record = parse_lines(lines(&cube(mixed_axes, &[], 125))).unwrap();
        assert_eq!(record.voxel_count(), [5, 5, 5]);
        assert_eq!(
            record.unit_conversion(),
            [BOHR_TO_ANGSTROM, 1.0, BOHR_TO_ANGSTROM]
        );
        assert_eq!(record.atom_count(), 0);
        assert_eq!(record.header(), "comment one\ncomment two\n");
        assert_eq!(
            record.origin(),
            [BOHR_TO_ANGSTROM, 2.0, 3.0 * BOHR_TO_ANGSTROM]
        );
        assert_eq!(record.voxels().get(0, 0, 1), Some(1.5));
        assert_eq!(record.voxels().get(4, 4, 4), Some(124.5));
    }

    #[rstest]
    #[case(124)]
    #[case(126)]
    #[case(0)]
    fn rejects_wrong_voxel_count(mixed_axes: [&'static str; 3], #[case] voxels: usize) {
        let err = parse_lines(lines(&cube(mixed_axes, &[], voxels))).unwrap_err();
        match err {
            ParseError::VoxelCount {
                shape,
                expected,
                found,
            } => {
                assert_eq!(shape, [5, 5, 5]);
                assert_eq!(expected, 125);
                assert_eq!(found, voxels);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case(["-10 0.2 0.0 0.0", "-10 0.0 0.2 0.0", "-10 0.0 0.0 0.2"], 1.0)]
    #[case(["10 0.2 0.0 0.0", "10 0.0 0.2 0.0", "10 0.0 0.0 0.2"], BOHR_TO_ANGSTROM)]
    fn sign_of_count_selects_unit(#[case] axes: [&str; 3], #[case] factor: f64) {
        let record = parse_lines(lines(&cube(axes, &[], 1000))).unwrap();
        assert_eq!(record.voxel_count(), [10, 10, 10]);
        assert_eq!(record.unit_conversion(), [factor; 3]);
        // 轴向量保持文件中的原始值
        assert_eq!(record.voxel_shape()[0], [0.2, 0.0, 0.0]);
    }

    #[rstest]
    #[case(["-2 1.0 0.0 0.0", "-2 0.0 1.0 0.0", "-2 0.0 0.0 1.0"], [1.0, 2.0, 3.0])]
    #[case(["2 1.0 0.0 0.0", "2 0.0 1.0 0.0", "2 0.0 0.0 1.0"], [
        BOHR_TO_ANGSTROM,
        2.0 * BOHR_TO_ANGSTROM,
        3.0 * BOHR_TO_ANGSTROM,
    ])]
    fn atom_coordinates_are_converted(#[case] axes: [&str; 3], #[case] expected: [f64; 3]) {
        let record = parse_lines(lines(&cube(axes, &["6 0.0 1.0 2.0 3.0"], 8))).unwrap();
        let atom = &record.atoms()[0];
        assert_eq!(atom.element, 6);
        assert_eq!(atom.charge, 0.0);
        for (actual, expected) in atom.xyz.iter().zip(expected) {
            assert_f64_near!(*actual, expected);
        }
    }

    #[rstest]
    #[case(0, 1)]
    #[case(0, 2)]
    #[case(1, 0)]
    #[case(1, 2)]
    #[case(2, 0)]
    #[case(2, 1)]
    fn rejects_any_off_diagonal_entry(#[case] row: usize, #[case] col: usize) {
        let mut steps = [[0.5, 0.0, 0.0], [0.0, 0.5, 0.0], [0.0, 0.0, 0.5]];
        steps[row][col] = 0.1;
        let axes: Vec<String> = steps
            .iter()
            .map(|s| format!("2 {} {} {}", s[0], s[1], s[2]))
            .collect();
        let text = cube([axes[0].as_str(), axes[1].as_str(), axes[2].as_str()], &[], 8);
        let err = parse_lines(lines(&text)).unwrap_err();
        assert!(matches!(err, ParseError::NonSquareVoxels { .. }));
    }

    #[test]
    fn scale_is_row_norm_times_unit() {
        let axes = ["3 0.25 0.0 0.0", "-3 0.0 -0.5 0.0", "3 0.0 0.0 2.0"];
        let record = parse_lines(lines(&cube(axes, &[], 27))).unwrap();
        for i in 0..3 {
            let row = record.voxel_shape()[i];
            let expected = row.iter().map(|v| v * v).sum::<f64>().sqrt() * record.unit_conversion()[i];
            assert_eq!(record.scale()[i], expected);
        }
        assert_f64_near!(record.scale()[1], 0.5);
    }

    #[test]
    fn payload_may_wrap_anywhere() {
        let text = "h1\nh2\n0 0.0 0.0 0.0\n\
                    -2 1.0 0.0 0.0\n-1 0.0 1.0 0.0\n-2 0.0 0.0 1.0\n\
                    1.0\n2.0 3.0 4.0\n\n   \n";
        let record = parse_lines(lines(text)).unwrap();
        assert_eq!(record.voxels().data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(record.voxels().get(1, 0, 1), Some(4.0));
    }

    #[test]
    fn extra_fields_on_header_lines_are_ignored() {
        let text = "h1\nh2\n1 0.0 0.0 0.0 1\n\
                    -1 1.0 0.0 0.0 extra\n-1 0.0 1.0 0.0\n-1 0.0 0.0 1.0\n\
                    8 0.0 0.0 0.0 0.0\n1.0E-03\n";
        let record = parse_lines(lines(text)).unwrap();
        assert_eq!(record.atom_count(), 1);
        assert_eq!(record.voxels().data(), &[1.0e-3]);
    }

    #[rstest]
    #[case("h1\n", "注释行")]
    #[case("h1\nh2\n", "原子数与原点")]
    #[case("h1\nh2\n1 0 0 0\n-1 1 0 0\n", "y 轴定义")]
    #[case("h1\nh2\n1 0 0 0\n-1 1 0 0\n-1 0 1 0\n-1 0 0 1\n", "原子信息")]
    fn reports_truncated_input(#[case] text: &str, #[case] missing: &str) {
        let err = parse_lines(lines(text)).unwrap_err();
        match err {
            ParseError::UnexpectedEof { expected, line } => {
                assert_eq!(expected, missing);
                assert_eq!(line, text.lines().count() + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case("h1\nh2\n0 0.0 0.0\n", "原点坐标")]
    #[case("h1\nh2\n0 0 0 0\n-1 1.0 0.0\n", "轴向量")]
    #[case("h1\nh2\n1 0 0 0\n-1 1 0 0\n-1 0 1 0\n-1 0 0 1\n6 0.0 1.0 2.0\n", "原子坐标")]
    fn reports_missing_fields(#[case] text: &str, #[case] missing: &str) {
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(
            matches!(err, ParseError::MissingToken { expected, .. } if expected == missing),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    #[case("h1\nh2\nx 0 0 0\n", 3)]
    #[case("h1\nh2\n0 0 0 0\n1.5 1 0 0\n", 4)]
    #[case("h1\nh2\n1 0 0 0\n-1 1 0 0\n-1 0 1 0\n-1 0 0 1\nC 0 0 0 0\n", 7)]
    fn reports_invalid_integers(#[case] text: &str, #[case] at_line: usize) {
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(
            matches!(err, ParseError::InvalidInteger { line, .. } if line == at_line),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reports_invalid_voxel_value_with_line() {
        let text = "h1\nh2\n0 0 0 0\n-1 1 0 0\n-1 0 1 0\n-2 0 0 1\n1.0\nabc\n";
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(
            matches!(err, ParseError::InvalidFloat { line: 8, ref token, .. } if token == "abc"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn negative_atom_count_is_unsupported() {
        let text = "h1\nh2\n-1 0 0 0\n-1 1 0 0\n-1 0 1 0\n-1 0 0 1\n";
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnsupportedVariant {
                line: 3,
                atom_count: -1
            }
        ));
    }

    #[test]
    fn overflowing_grid_is_rejected() {
        let text = "h1\nh2\n0 0 0 0\n\
                    -9999999999 1 0 0\n-9999999999 0 1 0\n-9999999999 0 0 1\n";
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(matches!(err, ParseError::GridTooLarge { .. }));
    }

    #[test]
    fn extreme_axis_counts_are_rejected() {
        let text = "h1\nh2\n0 0 0 0\n\
                    -9223372036854775808 1 0 0\n-9223372036854775808 0 1 0\n2 0 0 1\n";
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(matches!(
            err,
            ParseError::GridTooLarge {
                counts: [9223372036854775808, 9223372036854775808, 2]
            }
        ));
    }

    #[rstest]
    #[case([4, 5, 6], Some([4, 5, 6]))]
    #[case([0, 5, 6], Some([0, 5, 6]))]
    #[case([1 << 40, 1 << 40, 1], None)]
    #[case([u64::MAX, 2, 1], None)]
    fn grid_shape_checks_each_axis_and_total(
        #[case] counts: [u64; 3],
        #[case] expected: Option<[usize; 3]>,
    ) {
        assert_eq!(grid_shape(counts), expected);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn axis_count_wider_than_usize_is_rejected() {
        assert_eq!(grid_shape([1 << 33, 1, 1]), None);
    }

    #[test]
    fn nan_voxel_propagates_to_max_value() {
        let text = "h1\nh2\n0 0 0 0\n-1 1 0 0\n-1 0 1 0\n-2 0 0 1\nNaN 0.5\n";
        let record = parse_lines(lines(text)).unwrap();
        assert!(record.voxels().data()[0].is_nan());
        assert!(record.max_voxel_val().is_nan());
    }

    #[test]
    fn line_break_always_ends_a_value() {
        let text = "h1\nh2\n0 0 0 0\n-1 1 0 0\n-1 0 1 0\n-1 0 0 1\n1.2\n34\n";
        let err = parse_lines(lines(text)).unwrap_err();
        assert!(matches!(
            err,
            ParseError::VoxelCount {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn read_errors_are_reported() {
        let input = vec![
            Ok("h1".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad bytes")),
        ];
        let err = parse_lines(input).unwrap_err();
        assert!(matches!(err, ParseError::Io { line: 2, .. }));
    }
}
