use serde::Serialize;

/// One row of a text range table: the closed interval and its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRange {
    pub lower: f64,
    pub upper: f64,
    pub text: String,
}

/// Raw-to-physical conversion rule attached to a channel (cc_type).
///
/// Each variant carries exactly the parameters its formula consumes.
/// Tags the format defines but this crate does not evaluate (text tables,
/// 65535 "1:1") collapse to [`Conversion::Identity`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Conversion {
    /// No conversion, physical equals raw.
    Identity,
    /// 0: `phys = raw * p2 + p1`
    Linear { p1: f64, p2: f64 },
    /// 1: piecewise-linear interpolation over ordered `(int, phys)` pairs
    TabInterp { table: Vec<(f64, f64)> },
    /// 2: stepwise lookup over ordered `(int, phys)` pairs
    Tab { table: Vec<(f64, f64)> },
    /// 6: `phys = (p2 - p4*(x - p5 - p6)) / (p3*(x - p5 - p6) - p1)`
    RationalOffset { p: [f64; 6] },
    /// 7: exponential, two parameter branches
    Exp { p: [f64; 7] },
    /// 8: logarithmic, same branches as [`Conversion::Exp`]
    Log { p: [f64; 7] },
    /// 9: `phys = (p1*x^2 + p2*x + p3) / (p4*x^2 + p5*x + p6)`
    RationalQuadratic { p: [f64; 6] },
    /// 10: ASAM text formula in one variable `X`
    TextFormula { formula: String },
    /// 12: first matching range (index >= 1) maps to its text, index 0 is
    /// the default
    TextRangeTable { ranges: Vec<TextRange> },
}

impl Conversion {
    pub fn is_identity(&self) -> bool {
        matches!(self, Conversion::Identity)
    }
}
