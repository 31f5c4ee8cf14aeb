use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::classify::{Classification, ShortenType};
use crate::error::{GapError, Result};
use crate::sorts;
use crate::structs::{FeatureRow, Gap, Grouping, ShortenedRow};

pub const DEFAULT_TARGET_GAP_WIDTH: i64 = 100;

/// Within every group, the intron-like row at rank `FORCED_INTRON_RANK`
/// (zero-based, start order) is compressed as if it matched a gap exactly
/// whenever it is wider than the target.
pub const FORCE_SECOND_INTRON_COMPRESSION: bool = true;
pub const FORCED_INTRON_RANK: usize = 1;

/// How rows that strictly contain gaps are resized.
///
/// `Surplus` removes, for every contained gap, the part of the gap beyond the
/// target width, so each gap inside the row ends up no wider than the target.
/// `Reference` is the arithmetic of plotly_ggtranscript's `shorten_gaps`:
/// it subtracts `min(gap_width, target) - target` per gap, a term that is
/// never positive, so it leaves rows around wide gaps untouched and widens
/// rows around gaps narrower than the target. Use it to match that output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PureWithinRule {
    #[default]
    Surplus,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressOptions {
    pub target_gap_width: i64,
    pub pure_within: PureWithinRule,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            target_gap_width: DEFAULT_TARGET_GAP_WIDTH,
            pure_within: PureWithinRule::default(),
        }
    }
}

impl CompressOptions {
    pub fn with_target_gap_width(target_gap_width: i64) -> Self {
        Self {
            target_gap_width,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_gap_width <= 0 {
            return Err(GapError::InvalidInput(format!(
                "target_gap_width must be positive, got {}",
                self.target_gap_width
            )));
        }
        Ok(())
    }
}

fn unshortened(rows: &[FeatureRow]) -> Vec<ShortenedRow> {
    rows.iter()
        .map(|&row| ShortenedRow {
            row,
            width: row.width(),
        })
        .collect()
}

fn linkage_is_consistent(
    rows: &[FeatureRow],
    gaps: &FxHashMap<usize, &Gap>,
    classification: &Classification,
) -> bool {
    let row_ids: FxHashSet<i64> = rows.iter().map(|r| r.idx).collect();
    classification
        .equal
        .iter()
        .chain(classification.pure_within.iter())
        .all(|hit| row_ids.contains(&hit.row_idx) && gaps.contains_key(&hit.gap_idx))
}

/// Rows whose shortening is forced regardless of their classification.
fn forced_rows(rows: &[FeatureRow], grouping: &Grouping, target: i64) -> FxHashSet<i64> {
    let mut forced = FxHashSet::default();
    if !FORCE_SECOND_INTRON_COMPRESSION || !grouping.is_grouped() {
        return forced;
    }

    let mut current_group = None;
    let mut rank = 0usize;
    for i in sorts::group_start_order(rows, grouping) {
        let row = &rows[i];
        if current_group != Some(row.group) {
            current_group = Some(row.group);
            rank = 0;
        }
        if rank == FORCED_INTRON_RANK && row.width() > target {
            forced.insert(row.idx);
        }
        rank += 1;
    }
    forced
}

/// Computes the width every row occupies once gaps are compressed.
///
/// Rows are returned in input order. A classification that refers to rows or
/// gaps not present in the input leaves every row at its original width.
pub fn compress(
    rows: &[FeatureRow],
    gaps: &[Gap],
    classification: &Classification,
    grouping: &Grouping,
    options: &CompressOptions,
) -> Result<Vec<ShortenedRow>> {
    options.validate()?;
    let target = options.target_gap_width;

    let gaps_by_idx: FxHashMap<usize, &Gap> = gaps.iter().map(|g| (g.idx, g)).collect();
    if !linkage_is_consistent(rows, &gaps_by_idx, classification) {
        warn!(
            "Gap classification does not match the {} rows and {} gaps given; leaving widths unchanged",
            rows.len(),
            gaps.len()
        );
        return Ok(unshortened(rows));
    }

    let mut types = classification.shorten_types();
    for idx in forced_rows(rows, grouping, target) {
        types.insert(idx, ShortenType::Equal);
    }
    let within_gaps = classification.within_gaps();

    let shortened = rows
        .iter()
        .map(|&row| {
            let width = row.width();
            let shortened_width = match types.get(&row.idx) {
                Some(ShortenType::Equal) if width > target => target,
                Some(ShortenType::PureWithin) => {
                    let (surplus, reference) = within_gaps
                        .get(&row.idx)
                        .into_iter()
                        .flatten()
                        .map(|gap_idx| gaps_by_idx[gap_idx].width())
                        .fold((0, 0), |(surplus, reference), gap_width| {
                            (
                                surplus + (gap_width - target).max(0),
                                reference + (gap_width.min(target) - target),
                            )
                        });
                    if surplus != -reference {
                        debug!(
                            "Row {} of width {}: surplus rule gives {}, reference rule gives {}",
                            row.idx,
                            width,
                            width - surplus,
                            width - reference
                        );
                    }
                    match options.pure_within {
                        PureWithinRule::Surplus => width - surplus,
                        PureWithinRule::Reference => width - reference,
                    }
                }
                _ => width,
            };
            ShortenedRow {
                row,
                width: shortened_width,
            }
        })
        .collect();

    Ok(shortened)
}
