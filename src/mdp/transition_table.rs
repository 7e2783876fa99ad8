//! Per-action transition probabilities, loaded from comma-separated text.
//!
//! The layout is the one thermostat tables are usually kept in:
//!
//! ```text
//! state,16.0,16.5,17.0
//! 16.0,0.2,0.7,0.1
//! 16.5,0,0.3,0.7
//! 17.0,0,0,1
//! ```
//!
//! The first cell of the header is ignored, the remaining header cells are
//! the state labels: ladder temperatures in strictly ascending order. Each
//! data row starts with its own label, followed by one probability per
//! destination in header order.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1};

use crate::error::{Error, Result};
use crate::mdp::ladder;

/// Transition probabilities of a single action.
///
/// `probabilities[[s, d]]` is the probability of moving from state `s` to
/// state `d`. Rows do not have to sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    labels: Vec<f64>,
    probabilities: Array2<f64>,
}

impl TransitionTable {
    /// Builds a table from state labels and a square probability matrix.
    ///
    /// # Errors
    /// Returns `Error::MalformedTable` if the matrix is not `n x n` for `n`
    /// labels, if a label is off the ladder or out of ascending order, or if
    /// a probability falls outside `[0, 1]`.
    pub fn new(labels: Vec<f64>, probabilities: Array2<f64>) -> Result<Self> {
        let n = labels.len();
        if probabilities.dim() != (n, n) {
            let (rows, cols) = probabilities.dim();
            return Err(Error::malformed(
                0,
                format!("expected a {n}x{n} matrix for {n} states, got {rows}x{cols}"),
            ));
        }
        check_labels(0, &labels)?;
        for ((s, d), &p) in probabilities.indexed_iter() {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::malformed(
                    0,
                    format!("probability {p} from state {s} to state {d} is outside [0, 1]"),
                ));
            }
        }

        Ok(Self {
            labels,
            probabilities,
        })
    }

    /// Reads and parses a table file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table: Self = text.parse()?;
        log::debug!("loaded {} states from {}", table.len(), path.display());
        Ok(table)
    }

    /// State labels in table order.
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Position of the state labelled `label`, if any.
    pub fn index_of(&self, label: f64) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    /// Outgoing probabilities of state `source`.
    ///
    /// # Panics
    /// Panics if `source >= self.len()`.
    pub fn row(&self, source: usize) -> ArrayView1<'_, f64> {
        self.probabilities.row(source)
    }

    pub fn probability(&self, source: usize, destination: usize) -> f64 {
        self.probabilities[[source, destination]]
    }

    /// Expected value of `values` after leaving `source`.
    ///
    /// Entries with probability exactly zero are skipped, never multiplied,
    /// so a non-finite value at an unreachable destination does not leak in.
    pub fn expected_value(&self, source: usize, values: &[f64]) -> f64 {
        self.row(source)
            .iter()
            .zip(values)
            .filter(|(p, _)| **p != 0.0)
            .map(|(&p, &v)| v * p)
            .sum()
    }
}

impl FromStr for TransitionTable {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| Error::malformed(1, "table is empty"))?;
        let labels = header
            .split(',')
            .skip(1)
            .map(|cell| parse_label(header_line, cell))
            .collect::<Result<Vec<f64>>>()?;
        if labels.is_empty() {
            return Err(Error::malformed(header_line, "header names no states"));
        }
        check_labels(header_line, &labels)?;

        let n = labels.len();
        let mut cells = Vec::with_capacity(n * n);
        let mut rows = 0;
        for (line_no, line) in lines {
            if rows == n {
                return Err(Error::malformed(
                    line_no,
                    format!("more data rows than the {n} states in the header"),
                ));
            }
            let mut fields = line.split(',');
            let label = parse_label(line_no, fields.next().unwrap_or_default())?;
            if label != labels[rows] {
                return Err(Error::malformed(
                    line_no,
                    format!(
                        "row is labelled {label} but header column {} is {}",
                        rows + 1,
                        labels[rows]
                    ),
                ));
            }
            let before = cells.len();
            for field in fields {
                cells.push(parse_probability(line_no, field)?);
            }
            let found = cells.len() - before;
            if found != n {
                return Err(Error::malformed(
                    line_no,
                    format!("expected {n} probabilities, found {found}"),
                ));
            }
            rows += 1;
        }
        if rows != n {
            return Err(Error::malformed(
                header_line,
                format!("header names {n} states but the table has {rows} data rows"),
            ));
        }

        let probabilities = Array2::from_shape_vec((n, n), cells)
            .map_err(|e| Error::malformed(header_line, e.to_string()))?;
        Ok(Self {
            labels,
            probabilities,
        })
    }
}

fn parse_label(line: usize, cell: &str) -> Result<f64> {
    let cell = cell.trim();
    match cell.parse::<f64>() {
        Ok(label) if label.is_finite() => Ok(label),
        _ => Err(Error::malformed(line, format!("state label {cell:?} is not a number"))),
    }
}

/// State labels must be ladder temperatures listed from coldest to warmest.
fn check_labels(line: usize, labels: &[f64]) -> Result<()> {
    if let Some(bad) = labels.iter().find(|&&l| !ladder::is_on_ladder(l)) {
        return Err(Error::malformed(
            line,
            format!("state label {bad} is not on the ladder 16.0..=25.0 in steps of 0.5"),
        ));
    }
    if let Some(pair) = labels.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(Error::malformed(
            line,
            format!(
                "state labels must be strictly ascending, found {} before {}",
                pair[0], pair[1]
            ),
        ));
    }
    Ok(())
}

fn parse_probability(line: usize, cell: &str) -> Result<f64> {
    let cell = cell.trim();
    let p = cell
        .parse::<f64>()
        .map_err(|_| Error::malformed(line, format!("probability {cell:?} is not a number")))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::malformed(
            line,
            format!("probability {p} is outside [0, 1]"),
        ));
    }
    Ok(p)
}
