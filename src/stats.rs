/// Median of `values`, averaging the two middle values for even lengths.
///
/// Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `numerator / denominator - 1`, undefined when either side is missing or
/// the denominator is zero.
pub fn relative_change(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d - 1.0),
        _ => None,
    }
}

/// `1 - value / reference`: how far `value` sits below `reference`.
pub fn discount(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    relative_change(value, reference).map(|change| -change)
}
