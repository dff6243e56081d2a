//! Neighbour selection and interpolation over a sorted range table.
//!
//! Every function here expects `rows` sorted ascending by range, which is
//! what [`crate::table::RangeTable`] guarantees.
//!
//! Up to three rows around the requested distance are picked: the two that
//! bracket it, then the nearer of the next-outward rows. Three rows with
//! distinct ranges give a Lagrange quadratic, two give a straight line and a
//! single row is returned as-is.

use crate::ballistics::{BallisticRow, Field, Solution, altitude_correction};
use crate::error::InterpolationError;

/// True iff `rows` is non-empty and `distance` lies inside its range span.
pub fn supports_range(rows: &[BallisticRow], distance: f64) -> bool {
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => first.range <= distance && distance <= last.range,
        _ => false,
    }
}

/// Picks the 1 to 3 rows used to interpolate at `distance`, ascending by range.
///
/// Rows sharing a range with one already picked are skipped, so at a
/// duplicated range the row that came first in the file is the one used.
pub fn neighbor_rows(rows: &[BallisticRow], distance: f64) -> Vec<&BallisticRow> {
    let idx = rows.partition_point(|row| row.range < distance);

    let mut neighbors: Vec<&BallisticRow> = Vec::with_capacity(3);
    if idx > 0 {
        neighbors.push(&rows[idx - 1]);
    }
    if let Some(row) = rows.get(idx) {
        neighbors.push(row);
    }

    let mut remaining: Vec<&BallisticRow> = Vec::with_capacity(2);
    if idx >= 2 {
        remaining.push(&rows[idx - 2]);
    }
    if let Some(row) = rows.get(idx + 1) {
        remaining.push(row);
    }
    remaining.sort_by(|a, b| (a.range - distance).abs().total_cmp(&(b.range - distance).abs()));

    for row in remaining {
        if neighbors.len() >= 3 {
            break;
        }
        if neighbors.iter().any(|picked| picked.range == row.range) {
            continue;
        }
        neighbors.push(row);
    }

    neighbors.sort_by(|a, b| a.range.total_cmp(&b.range));
    neighbors
}

/// Interpolates one column of the table at `distance`.
///
/// No range check is made here; outside the table span the selected rows
/// are extrapolated.
pub fn interpolate_field(
    rows: &[BallisticRow],
    field: Field,
    distance: f64,
) -> Result<f64, InterpolationError> {
    let neighbors = neighbor_rows(rows, distance);
    match neighbors.as_slice() {
        [] => Err(InterpolationError::InsufficientData),
        [only] => Ok(only.field(field)),
        [lower, upper] => Ok(linear(lower, upper, field, distance)),
        // neighbor_rows never yields more than three rows, all with distinct ranges.
        [p0, p1, p2, ..] => Ok(lagrange(p0, p1, p2, field, distance)),
    }
}

/// Interpolates a full firing solution for one charge.
pub fn calculate(
    rows: &[BallisticRow],
    charge: u32,
    distance: f64,
    altitude_delta: f64,
) -> Result<Solution, InterpolationError> {
    if !supports_range(rows, distance) {
        return Err(match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => InterpolationError::OutOfRange {
                distance,
                min: first.range,
                max: last.range,
            },
            _ => InterpolationError::InsufficientData,
        });
    }

    let base_mill = interpolate_field(rows, Field::Mill, distance)?;
    let diff100m = interpolate_field(rows, Field::Diff100m, distance)?;
    let eta = interpolate_field(rows, Field::Eta, distance)?;

    Ok(Solution {
        mill: base_mill + altitude_correction(altitude_delta, diff100m),
        eta,
        charge,
        base_mill,
        diff100m,
    })
}

fn linear(lower: &BallisticRow, upper: &BallisticRow, field: Field, distance: f64) -> f64 {
    // Unreachable through neighbor_rows; kept so a duplicate pair cannot divide by zero.
    if upper.range == lower.range {
        return lower.field(field);
    }
    let ratio = (distance - lower.range) / (upper.range - lower.range);
    let (y0, y1) = (lower.field(field), upper.field(field));
    y0 + ratio * (y1 - y0)
}

#[inline]
fn basis(x: f64, a: f64, b: f64) -> f64 {
    if a == b { 0.0 } else { (x - a) / (b - a) }
}

fn lagrange(
    p0: &BallisticRow,
    p1: &BallisticRow,
    p2: &BallisticRow,
    field: Field,
    distance: f64,
) -> f64 {
    let (x0, x1, x2) = (p0.range, p1.range, p2.range);
    let t0 = basis(distance, x1, x0) * basis(distance, x2, x0);
    let t1 = basis(distance, x0, x1) * basis(distance, x2, x1);
    let t2 = basis(distance, x0, x2) * basis(distance, x1, x2);
    p0.field(field) * t0 + p1.field(field) * t1 + p2.field(field) * t2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(range: f64, mill: f64) -> BallisticRow {
        BallisticRow::new(range, mill, 0.0, 0.0)
    }

    fn ranges(rows: &[&BallisticRow]) -> Vec<f64> {
        rows.iter().map(|r| r.range).collect()
    }

    #[test]
    fn test_neighbors_interior_prefers_closer_outer_row() {
        let rows = [row(1000.0, 0.0), row(2000.0, 0.0), row(3000.0, 0.0), row(4000.0, 0.0)];
        // Brackets 2000/3000; 1000 is 1400 away, 4000 is 1600 away.
        assert_eq!(ranges(&neighbor_rows(&rows, 2400.0)), vec![1000.0, 2000.0, 3000.0]);
        assert_eq!(ranges(&neighbor_rows(&rows, 2600.0)), vec![2000.0, 3000.0, 4000.0]);
    }

    #[test]
    fn test_neighbors_at_edges() {
        let rows = [row(1000.0, 0.0), row(2000.0, 0.0), row(3000.0, 0.0)];
        assert_eq!(ranges(&neighbor_rows(&rows, 1000.0)), vec![1000.0, 2000.0]);
        assert_eq!(ranges(&neighbor_rows(&rows, 3000.0)), vec![1000.0, 2000.0, 3000.0]);
        assert!(neighbor_rows(&[], 1000.0).is_empty());
    }

    #[test]
    fn test_neighbors_exact_match_uses_left_insertion_point() {
        let rows = [row(1000.0, 0.0), row(2000.0, 0.0), row(3000.0, 0.0), row(4000.0, 0.0)];
        // idx lands on 2000, so 1000/2000 bracket and 3000 is the nearer outer row.
        assert_eq!(ranges(&neighbor_rows(&rows, 2000.0)), vec![1000.0, 2000.0, 3000.0]);
    }

    #[test]
    fn test_single_row_is_flat() {
        let rows = [BallisticRow::new(1500.0, 700.0, 4.0, 30.0)];
        assert_eq!(interpolate_field(&rows, Field::Mill, 1500.0), Ok(700.0));
        assert_eq!(interpolate_field(&rows, Field::Eta, 1500.0), Ok(30.0));
    }

    #[test]
    fn test_two_rows_linear() {
        let rows = [row(1000.0, 800.0), row(2000.0, 600.0)];
        let mid = interpolate_field(&rows, Field::Mill, 1250.0).unwrap();
        assert!((mid - 750.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_rows_quadratic_reproduces_parabola() {
        // y = (x / 1000)^2
        let rows = [row(1000.0, 1.0), row(2000.0, 4.0), row(3000.0, 9.0)];
        let y = interpolate_field(&rows, Field::Mill, 2500.0).unwrap();
        assert!((y - 6.25).abs() < 1e-9);
    }

    #[test]
    fn test_neighbors_never_share_a_range() {
        let rows = [
            row(1000.0, 800.0),
            row(1000.0, 805.0),
            row(2000.0, 600.0),
            row(2000.0, 610.0),
            row(2000.0, 620.0),
            row(3000.0, 450.0),
            row(3000.0, 455.0),
        ];
        let mut distance = 1000.0;
        while distance <= 3000.0 {
            let picked = ranges(&neighbor_rows(&rows, distance));
            assert!(
                picked.windows(2).all(|pair| pair[0] < pair[1]),
                "repeated range at {distance}: {picked:?}"
            );
            let mill = interpolate_field(&rows, Field::Mill, distance).unwrap();
            assert!((450.0..=805.0).contains(&mill), "mill {mill} at {distance}");
            distance += 125.0;
        }
    }

    #[test]
    fn test_linear_duplicate_pair_returns_lower() {
        let (lower, upper) = (row(2000.0, 600.0), row(2000.0, 610.0));
        assert_eq!(linear(&lower, &upper, Field::Mill, 2000.0), 600.0);
    }

    #[test]
    fn test_basis_guard() {
        assert_eq!(basis(5.0, 2.0, 2.0), 0.0);
        assert_eq!(basis(3.0, 2.0, 4.0), 0.5);
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(
            interpolate_field(&[], Field::Mill, 1.0),
            Err(InterpolationError::InsufficientData)
        );
        assert_eq!(calculate(&[], 0, 1.0, 0.0), Err(InterpolationError::InsufficientData));
    }

    #[test]
    fn test_out_of_range_reports_span() {
        let rows = [row(1000.0, 800.0), row(2000.0, 600.0)];
        assert_eq!(
            calculate(&rows, 2, 2500.0, 0.0),
            Err(InterpolationError::OutOfRange { distance: 2500.0, min: 1000.0, max: 2000.0 })
        );
        assert!(calculate(&rows, 2, f64::NAN, 0.0).is_err());
    }
}
