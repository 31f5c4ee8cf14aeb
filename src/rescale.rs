use std::time::Instant;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::error::{GapError, Result};
use crate::sorts;
use crate::structs::{FeatureRow, FeatureType, Grouping, RescaledRow, ShortenedRow};

/// Lays exons and shortened introns end to end, group by group.
///
/// Within a group rows are ordered by (start, end) and each row's rescaled end
/// is the running sum of widths, so the first row of every group starts at 1.
/// When grouped, `start_offsets` shifts each group right by its compressed
/// leading space; groups missing from the map are dropped. Introns are then
/// widened by one base on each side so they meet their flanking exons.
pub fn rescale(
    exons: &[FeatureRow],
    shortened_introns: &[ShortenedRow],
    start_offsets: Option<&FxHashMap<i64, i64>>,
    grouping: &Grouping,
) -> Result<Vec<RescaledRow>> {
    let start = Instant::now();

    if let Some(bad) = shortened_introns
        .iter()
        .find(|r| r.row.feature != FeatureType::Intron)
    {
        return Err(GapError::InvalidInput(format!(
            "shortened introns must all be of type 'intron', row {} is '{}'",
            bad.row.idx,
            bad.row.feature.as_str()
        )));
    }

    let mut rows: Vec<ShortenedRow> = Vec::with_capacity(exons.len() + shortened_introns.len());
    rows.extend(exons.iter().map(|&row| ShortenedRow {
        row,
        width: row.width(),
    }));
    rows.extend_from_slice(shortened_introns);
    sorts::sort_shortened_rows(&mut rows, grouping);

    let mut out = Vec::with_capacity(rows.len());
    let mut current_group = None;
    let mut running_sum = 0_i64;
    let mut dropped = 0_usize;

    for shortened in rows {
        let row = shortened.row;
        let group = grouping.key_of(&row);
        if current_group != Some(group) {
            current_group = Some(group);
            running_sum = 0;
        }
        running_sum += shortened.width;

        let offset = match (grouping, start_offsets) {
            (Grouping::GroupedBy(_), Some(offsets)) => match offsets.get(&group) {
                Some(&offset) => offset,
                None => {
                    dropped += 1;
                    continue;
                }
            },
            _ => 0,
        };

        let mut rescaled_end = running_sum + offset;
        let mut rescaled_start = rescaled_end - shortened.width + 1;
        if row.feature == FeatureType::Intron {
            rescaled_start -= 1;
            rescaled_end += 1;
        }

        out.push(RescaledRow {
            idx: row.idx,
            chr: row.chr,
            strand: row.strand,
            feature: row.feature,
            group: row.group,
            start: rescaled_start,
            end: rescaled_end,
        });
    }

    if dropped > 0 {
        warn!("Dropped {} rows whose group has no start offset", dropped);
    }
    debug!("Rescaled {} rows in {:?}", out.len(), start.elapsed());

    Ok(out)
}
