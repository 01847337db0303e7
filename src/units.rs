//! 长度单位与换算。内部统一使用埃 (Å)。

/// 玻尔半径换算为埃 (2018 CODATA)
pub const BOHR_TO_ANGSTROM: f64 = 5.29177210903 / 10.0;

/// cube 文件每个轴声明的长度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    #[default]
    Angstrom,
    Bohr,
}

impl LengthUnit {
    /// 由轴定义行的体素数符号决定单位: 负数为埃，非负为玻尔
    pub fn from_count_sign(count: i64) -> Self {
        if count < 0 {
            LengthUnit::Angstrom
        } else {
            LengthUnit::Bohr
        }
    }

    /// 换算到埃的系数
    pub fn to_angstrom(self) -> f64 {
        match self {
            LengthUnit::Angstrom => 1.0,
            LengthUnit::Bohr => BOHR_TO_ANGSTROM,
        }
    }
}
