use std::time::Instant;

use log::debug;

use crate::error::{GapError, Result};
use crate::sorts;
use crate::structs::{FeatureRow, Gap, Interval};

/// Checks that every row lies on the same chromosome and strand as the first.
pub fn check_single_partition(rows: &[FeatureRow]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    if let Some(other) = rows
        .iter()
        .find(|r| r.chr != first.chr || r.strand != first.strand)
    {
        return Err(GapError::InvalidInput(format!(
            "exons must be from a single chromosome and strand, found ({}, {}) and ({}, {})",
            first.chr, first.strand, other.chr, other.strand
        )));
    }
    Ok(())
}

/// Collapses overlapping exons into sorted, non-overlapping blocks.
///
/// Blocks that merely touch (`next.start == current.end + 1`) stay separate;
/// the gap extractor discards the zero-width gap between them.
pub fn merge_exons(exons: &[FeatureRow]) -> Result<Vec<Interval>> {
    check_single_partition(exons)?;

    let mut merged: Vec<Interval> = Vec::with_capacity(exons.len());
    for interval in sorts::build_sorted_intervals(exons) {
        if let Some(current) = merged.last_mut() {
            if interval.start <= current.end {
                current.end = current.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    Ok(merged)
}

pub fn gaps_between(blocks: &[Interval]) -> Vec<Gap> {
    let mut gaps = Vec::with_capacity(blocks.len().saturating_sub(1));
    for pair in blocks.windows(2) {
        let start = pair[0].end + 1;
        let end = pair[1].start - 1;
        if start <= end {
            gaps.push(Gap {
                idx: gaps.len(),
                start,
                end,
            });
        }
    }
    gaps
}

pub fn merge_and_find_gaps(exons: &[FeatureRow]) -> Result<Vec<Gap>> {
    let start = Instant::now();

    let blocks = merge_exons(exons)?;
    let gaps = gaps_between(&blocks);

    debug!(
        "Merged {} exons into {} blocks with {} gaps in {:?}",
        exons.len(),
        blocks.len(),
        gaps.len(),
        start.elapsed()
    );
    Ok(gaps)
}
