//! Reading the flux assignments written by an enumerator
use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::flux_mode::FluxModeId;
use crate::pipeline::EnumeratorError;

/// Parse enumerator output, one flux assignment per line
///
/// Each non-blank line holds whitespace separated fluxes, one per entry of `columns`. Flux
/// modes are numbered from 1 in line order, and fluxes within `tolerance` of zero are dropped.
///
/// # Examples
/// ```rust
/// use efmrs_core::pipeline::enumerator_output::parse_flux_assignments;
/// let columns = vec!["r1".to_string(), "r2".to_string()];
/// let parsed = parse_flux_assignments(&columns, "1.5 0\n\n0 -2\n", 1e-7).unwrap();
/// assert_eq!(parsed[&1]["r1"], 1.5);
/// assert_eq!(parsed[&2]["r2"], -2.0);
/// ```
pub fn parse_flux_assignments(
    columns: &[String],
    output: &str,
    tolerance: f64,
) -> Result<BTreeMap<FluxModeId, IndexMap<String, f64>>, EnumeratorError> {
    let mut assignments = BTreeMap::new();
    let lines = output
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());
    for (id, (line_index, line)) in lines.enumerate() {
        let line_number = line_index + 1;
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() != columns.len() {
            return Err(EnumeratorError::ColumnCount {
                line: line_number,
                expected: columns.len(),
                found: values.len(),
            });
        }
        let mut fluxes = IndexMap::new();
        for (column, value) in columns.iter().zip(values) {
            let flux: f64 = value
                .parse()
                .map_err(|_| EnumeratorError::MalformedValue {
                    line: line_number,
                    value: value.to_string(),
                })?;
            if !flux.is_finite() {
                return Err(EnumeratorError::NonFiniteValue {
                    line: line_number,
                    value: value.to_string(),
                });
            }
            if flux.abs() > tolerance {
                fluxes.insert(column.clone(), flux);
            }
        }
        assignments.insert(id + 1, fluxes);
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fluxes;

    fn columns() -> Vec<String> {
        ["r1", "r2", "r3"].iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn small_fluxes_are_zero() {
        let parsed = parse_flux_assignments(&columns(), "1e-9 2 -0.5\n", 1e-7).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&1], fluxes(&[("r2", 2.), ("r3", -0.5)]));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let parsed = parse_flux_assignments(&columns(), "\n1 0 0\n   \n0 0 3\n", 1e-7).unwrap();
        assert_eq!(parsed.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(parsed[&2], fluxes(&[("r3", 3.)]));
        assert!(parse_flux_assignments(&columns(), "", 1e-7).unwrap().is_empty());
    }

    #[test]
    fn malformed_lines() {
        assert_eq!(
            parse_flux_assignments(&columns(), "1 0 0\n1 0\n", 1e-7),
            Err(EnumeratorError::ColumnCount {
                line: 2,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            parse_flux_assignments(&columns(), "1 x 0\n", 1e-7),
            Err(EnumeratorError::MalformedValue {
                line: 1,
                value: "x".to_string()
            })
        );
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(
            parse_flux_assignments(&columns(), "1 0 0\nNaN 1 0\n", 1e-7),
            Err(EnumeratorError::NonFiniteValue {
                line: 2,
                value: "NaN".to_string()
            })
        );
        assert_eq!(
            parse_flux_assignments(&columns(), "0 -inf 1\n", 1e-7),
            Err(EnumeratorError::NonFiniteValue {
                line: 1,
                value: "-inf".to_string()
            })
        );
    }
}
