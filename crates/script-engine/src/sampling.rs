//! Sampling helpers over a chronological price series.
//!
//! Series are ordered oldest first. Sampling counts backward from the most
//! recent element so the latest value is always part of the sample.

use rust_decimal::Decimal;

/// Floors `value` to the nearest lower multiple of `step`.
///
/// A zero step, or one so small the quotient overflows, leaves the value
/// unchanged.
pub fn round_by_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    value
        .checked_div(step)
        .and_then(|steps| steps.floor().checked_mul(step))
        .unwrap_or(value)
}

/// Indices of the most recent `length` elements of a series of `len`
/// elements, taken every `interval` elements counting back from the end.
///
/// Returned in chronological order. `None` when the series is too short or
/// `interval` is zero.
pub fn sample_indices(len: usize, interval: usize, length: usize) -> Option<Vec<usize>> {
    if interval == 0 {
        return None;
    }

    let mut indices: Vec<usize> = (0..len).rev().step_by(interval).take(length).collect();
    if indices.len() < length {
        return None;
    }
    indices.reverse();
    Some(indices)
}

/// Values at [`sample_indices`] positions.
pub fn take_samples<T: Clone>(series: &[T], interval: usize, length: usize) -> Option<Vec<T>> {
    sample_indices(series.len(), interval, length)
        .map(|indices| indices.into_iter().map(|i| series[i].clone()).collect())
}

/// Relative change between each pair of consecutive prices, as
/// `max(a, b) / min(a, b) - 1`. `None` if any price is not positive or a
/// ratio does not fit in a `Decimal`.
pub fn price_changes(prices: &[Decimal]) -> Option<Vec<Decimal>> {
    if prices.iter().any(|p| *p <= Decimal::ZERO) {
        return None;
    }

    prices
        .windows(2)
        .map(|pair| {
            pair[0]
                .max(pair[1])
                .checked_div(pair[0].min(pair[1]))
                .map(|ratio| ratio - Decimal::ONE)
        })
        .collect()
}

/// Arithmetic mean. `None` for an empty slice or when the sum overflows.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(*value))?;
    sum.checked_div(Decimal::from(values.len()))
}

/// Median; the midpoint of the two middle values for an even count. `None`
/// for an empty slice.
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(midpoint(sorted[mid - 1], sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Halfway between `lo <= hi` without leaving the `Decimal` range.
fn midpoint(lo: Decimal, hi: Decimal) -> Decimal {
    if lo.is_sign_negative() == hi.is_sign_negative() {
        lo + (hi - lo) / Decimal::TWO
    } else {
        (lo + hi) / Decimal::TWO
    }
}

/// Reduces the consecutive changes between `samples` with `reducer`.
pub fn reduce_changes<F>(samples: &[Decimal], reducer: F) -> Option<Decimal>
where
    F: FnOnce(&[Decimal]) -> Option<Decimal>,
{
    let changes = price_changes(samples)?;
    reducer(&changes)
}

/// Samples `length + 1` prices and reduces the `length` consecutive changes
/// between them with `reducer`.
///
/// `None` for a zero `length`, a short series, non-positive prices, or when
/// the reducer yields nothing.
pub fn price_volatility<F>(
    prices: &[Decimal],
    interval: usize,
    length: usize,
    reducer: F,
) -> Option<Decimal>
where
    F: FnOnce(&[Decimal]) -> Option<Decimal>,
{
    if length == 0 {
        return None;
    }
    let samples = take_samples(prices, interval, length + 1)?;
    reduce_changes(&samples, reducer)
}
