use meval::{Context, Expr};

use crate::error::MdfError;

/// Evaluates an ASAM text formula in the variable `X` over a column.
///
/// ASAM-MCD2 spells exponentiation `pow(...)`; the expression evaluator
/// knows it as a custom two-argument function, so the call is rewritten to
/// `power(...)` and bound in the context.
pub(crate) fn eval_formula(
    formula: &str,
    channel: &str,
    data: &[f64],
) -> Result<Vec<f64>, MdfError> {
    let rewritten = formula.replace("pow(", "power(");
    let expr: Expr = rewritten.parse().map_err(|err| MdfError::FeatureUnavailable {
        channel: channel.to_string(),
        reason: format!("{err}"),
    })?;

    let mut context = Context::new();
    context.func2("power", |base: f64, exponent: f64| base.powf(exponent));

    let func = expr
        .bind_with_context(context, "X")
        .map_err(|err| MdfError::FeatureUnavailable {
            channel: channel.to_string(),
            reason: format!("{err}"),
        })?;

    Ok(data.iter().map(|&x| func(x)).collect())
}
