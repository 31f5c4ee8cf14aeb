use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::compress::{CompressOptions, PureWithinRule};
use crate::error::{GapError, Result};
use crate::merge::merge_and_find_gaps;
use crate::shorten::shorten_gaps;
use crate::structs::{FeatureRow, FeatureType, Grouping, Strand};

impl From<GapError> for PyErr {
    fn from(err: GapError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn build_rows(
    chrs: &[i64],
    strand_flags: &[bool],
    starts: &[i64],
    ends: &[i64],
    groups: &[i64],
    feature: FeatureType,
    first_idx: i64,
) -> Result<Vec<FeatureRow>> {
    let n = chrs.len();
    if [strand_flags.len(), starts.len(), ends.len(), groups.len()]
        .iter()
        .any(|&len| len != n)
    {
        return Err(GapError::InvalidInput(format!(
            "{} arrays must all have the same length",
            feature.as_str()
        )));
    }

    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        rows.push(FeatureRow {
            idx: first_idx + i as i64,
            chr: chrs[i],
            strand: Strand::from_flag(strand_flags[i]),
            start: starts[i],
            end: ends[i],
            feature,
            group: groups[i],
        });
    }
    Ok(rows)
}

/// Returns (idxs, starts, ends) in rescaled order. Exons are numbered
/// `0..n_exons` and introns `n_exons..n_exons + n_introns`.
#[pyfunction]
#[pyo3(signature = (
    exon_chrs, exon_strand_flags, exon_starts, exon_ends, exon_groups,
    intron_chrs, intron_strand_flags, intron_starts, intron_ends, intron_groups,
    grouped = false, target_gap_width = 100, reference_pure_within = false
))]
pub fn shorten_gaps_numpy(
    py: Python,
    exon_chrs: PyReadonlyArray1<i64>,
    exon_strand_flags: PyReadonlyArray1<bool>,
    exon_starts: PyReadonlyArray1<i64>,
    exon_ends: PyReadonlyArray1<i64>,
    exon_groups: PyReadonlyArray1<i64>,
    intron_chrs: PyReadonlyArray1<i64>,
    intron_strand_flags: PyReadonlyArray1<bool>,
    intron_starts: PyReadonlyArray1<i64>,
    intron_ends: PyReadonlyArray1<i64>,
    intron_groups: PyReadonlyArray1<i64>,
    grouped: bool,
    target_gap_width: i64,
    reference_pure_within: bool,
) -> PyResult<(Py<PyArray1<i64>>, Py<PyArray1<i64>>, Py<PyArray1<i64>>)> {
    let exons = build_rows(
        exon_chrs.as_slice()?,
        exon_strand_flags.as_slice()?,
        exon_starts.as_slice()?,
        exon_ends.as_slice()?,
        exon_groups.as_slice()?,
        FeatureType::Exon,
        0,
    )?;
    let introns = build_rows(
        intron_chrs.as_slice()?,
        intron_strand_flags.as_slice()?,
        intron_starts.as_slice()?,
        intron_ends.as_slice()?,
        intron_groups.as_slice()?,
        FeatureType::Intron,
        exons.len() as i64,
    )?;

    let grouping = if grouped {
        Grouping::by(["group"])
    } else {
        Grouping::Ungrouped
    };
    let options = CompressOptions {
        target_gap_width,
        pure_within: if reference_pure_within {
            PureWithinRule::Reference
        } else {
            PureWithinRule::Surplus
        },
    };

    let rescaled = shorten_gaps(&exons, &introns, &grouping, &options)?;
    let idxs: Vec<i64> = rescaled.iter().map(|r| r.idx).collect();
    let starts: Vec<i64> = rescaled.iter().map(|r| r.start).collect();
    let ends: Vec<i64> = rescaled.iter().map(|r| r.end).collect();

    Ok((
        idxs.into_pyarray(py).to_owned().into(),
        starts.into_pyarray(py).to_owned().into(),
        ends.into_pyarray(py).to_owned().into(),
    ))
}

#[pyfunction]
pub fn merge_and_find_gaps_numpy(
    chrs: PyReadonlyArray1<i64>,
    strand_flags: PyReadonlyArray1<bool>,
    starts: PyReadonlyArray1<i64>,
    ends: PyReadonlyArray1<i64>,
    py: Python,
) -> PyResult<(Py<PyArray1<i64>>, Py<PyArray1<i64>>)> {
    let chrs = chrs.as_slice()?;
    let groups = vec![0; chrs.len()];
    let exons = build_rows(
        chrs,
        strand_flags.as_slice()?,
        starts.as_slice()?,
        ends.as_slice()?,
        &groups,
        FeatureType::Exon,
        0,
    )?;

    let gaps = merge_and_find_gaps(&exons)?;
    let gap_starts: Vec<i64> = gaps.iter().map(|g| g.start).collect();
    let gap_ends: Vec<i64> = gaps.iter().map(|g| g.end).collect();
    Ok((
        gap_starts.into_pyarray(py).to_owned().into(),
        gap_ends.into_pyarray(py).to_owned().into(),
    ))
}

#[pymodule]
fn rutranscript(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(shorten_gaps_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(merge_and_find_gaps_numpy, m)?)?;
    Ok(())
}
