use log::warn;

use crate::blocks::conversion::types::Conversion;
use crate::error::MdfError;
use crate::parsing::decoder::SampleColumn;
use super::formula::eval_formula;

impl Conversion {
    /// Applies the conversion to a whole raw column.
    ///
    /// Numeric conversions produce an `F64` column, except the identity
    /// forms which keep the raw column and its integer type. Text range
    /// tables produce a `Text` column.
    ///
    /// Errors follow the per-channel policy: [`MdfError::InvalidConversion`]
    /// when exponential/logarithmic parameters satisfy no branch and
    /// [`MdfError::FeatureUnavailable`] when a text formula cannot be
    /// evaluated; the caller is expected to keep the raw column in both
    /// cases.
    pub fn apply(&self, channel: &str, data: &SampleColumn) -> Result<SampleColumn, MdfError> {
        match self {
            Conversion::Identity => Ok(data.clone()),
            Conversion::Linear { p1, p2 } => {
                // The common 1:1 scaling keeps the raw dtype.
                if *p2 == 1.0 && *p1 == 0.0 {
                    return Ok(data.clone());
                }
                let raw = extract_numeric(channel, data)?;
                Ok(SampleColumn::F64(raw.iter().map(|&x| x * p2 + p1).collect()))
            }
            Conversion::TabInterp { table } => {
                if table.is_empty() {
                    warn!("channel {channel}: empty interpolation table, keeping raw values");
                    return Ok(data.clone());
                }
                let raw = extract_numeric(channel, data)?;
                Ok(SampleColumn::F64(raw.iter().map(|&x| interp(table, x)).collect()))
            }
            Conversion::Tab { table } => {
                if table.is_empty() {
                    warn!("channel {channel}: empty lookup table, keeping raw values");
                    return Ok(data.clone());
                }
                let raw = extract_numeric(channel, data)?;
                let lookup = |x: f64| {
                    let index = table.partition_point(|&(key, _)| key < x);
                    table[index.min(table.len() - 1)].1
                };
                Ok(SampleColumn::F64(raw.iter().map(|&x| lookup(x)).collect()))
            }
            Conversion::RationalOffset { p } => {
                let [p1, p2, p3, p4, p5, p6] = *p;
                let raw = extract_numeric(channel, data)?;
                let values = raw
                    .iter()
                    .map(|&x| (p2 - p4 * (x - p5 - p6)) / (p3 * (x - p5 - p6) - p1))
                    .collect();
                Ok(SampleColumn::F64(values))
            }
            Conversion::Exp { p } => apply_exp_log(channel, data, p, f64::exp),
            Conversion::Log { p } => apply_exp_log(channel, data, p, f64::ln),
            Conversion::RationalQuadratic { p } => {
                let [p1, p2, p3, p4, p5, p6] = *p;
                let raw = extract_numeric(channel, data)?;
                let values = raw
                    .iter()
                    .map(|&x| (p1 * x * x + p2 * x + p3) / (p4 * x * x + p5 * x + p6))
                    .collect();
                Ok(SampleColumn::F64(values))
            }
            Conversion::TextFormula { formula } => {
                let raw = extract_numeric(channel, data)?;
                Ok(SampleColumn::F64(eval_formula(formula, channel, &raw)?))
            }
            Conversion::TextRangeTable { ranges } => {
                if ranges.is_empty() {
                    warn!("channel {channel}: text range table has no entries, keeping raw values");
                    return Ok(data.clone());
                }
                let raw = extract_numeric(channel, data)?;
                let values = raw
                    .iter()
                    .map(|&x| {
                        // Entry 0 is the default, matching starts at 1 and
                        // the first hit wins.
                        ranges[1..]
                            .iter()
                            .find(|range| range.lower <= x && x <= range.upper)
                            .unwrap_or(&ranges[0])
                            .text
                            .clone()
                    })
                    .collect();
                Ok(SampleColumn::Text(values))
            }
        }
    }
}

fn extract_numeric(channel: &str, data: &SampleColumn) -> Result<Vec<f64>, MdfError> {
    data.as_f64_vec().ok_or_else(|| MdfError::InvalidConversion(channel.to_string()))
}

/// Exponential and logarithmic conversions share the same two parameter
/// branches; only the transcendental differs.
fn apply_exp_log(
    channel: &str,
    data: &SampleColumn,
    p: &[f64; 7],
    func: fn(f64) -> f64,
) -> Result<SampleColumn, MdfError> {
    let [p1, p2, p3, p4, p5, p6, p7] = *p;
    let raw = extract_numeric(channel, data)?;
    let values: Vec<f64> = if p4 == 0.0 && p1 != 0.0 && p2 != 0.0 {
        raw.iter().map(|&x| func(((x - p7) * p6 - p3) / p1) / p2).collect()
    } else if p1 == 0.0 && p4 != 0.0 && p5 != 0.0 {
        raw.iter().map(|&x| func((p3 / (x - p7) - p6) / p4) / p5).collect()
    } else {
        return Err(MdfError::InvalidConversion(channel.to_string()));
    };
    Ok(SampleColumn::F64(values))
}

fn interp(table: &[(f64, f64)], x: f64) -> f64 {
    let n = table.len();
    if x <= table[0].0 {
        return table[0].1;
    }
    if x >= table[n - 1].0 {
        return table[n - 1].1;
    }
    let upper = table.partition_point(|&(key, _)| key < x);
    let (x0, y0) = table[upper - 1];
    let (x1, y1) = table[upper];
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}
