use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::classify::classify_gaps;
use crate::compress::{compress, CompressOptions};
use crate::error::{GapError, Result};
use crate::introns::tx_start_gaps;
use crate::merge::merge_and_find_gaps;
use crate::rescale::rescale;
use crate::structs::{FeatureRow, FeatureType, Gap, Grouping, RescaledRow, Strand};

fn check_inputs(exons: &[FeatureRow], introns: &[FeatureRow]) -> Result<()> {
    if let Some(bad) = introns.iter().find(|r| r.feature != FeatureType::Intron) {
        return Err(GapError::InvalidInput(format!(
            "all rows of the intron table must be of type 'intron', row {} is '{}'",
            bad.idx,
            bad.feature.as_str()
        )));
    }
    let mut seen = FxHashSet::default();
    if let Some(dup) = exons.iter().chain(introns).find(|r| !seen.insert(r.idx)) {
        return Err(GapError::InvalidInput(format!(
            "row id {} is used more than once",
            dup.idx
        )));
    }
    Ok(())
}

/// Introns are given sharing one base with each flanking exon; gap matching
/// works on the strictly intronic bases.
fn trim_introns(introns: &[FeatureRow]) -> Vec<FeatureRow> {
    introns
        .iter()
        .map(|&r| FeatureRow {
            start: r.start + 1,
            end: r.end - 1,
            ..r
        })
        .collect()
}

/// Compressed leading space of every group, measured from the leftmost exon.
fn start_offsets(
    exons: &[FeatureRow],
    gaps: &[Gap],
    grouping: &Grouping,
    options: &CompressOptions,
) -> Result<FxHashMap<i64, i64>> {
    let start_gaps = tx_start_gaps(exons, grouping);
    let classification = classify_gaps(&start_gaps, gaps);
    let shortened = compress(&start_gaps, gaps, &classification, grouping, options)?;
    // a start gap includes the group's first exon base, which is not leading space
    Ok(shortened
        .into_iter()
        .map(|s| (s.row.group, s.width - 1))
        .collect())
}

/// Rescales one gene's exons and introns so that long intronic gaps are
/// compressed to at most `options.target_gap_width`.
///
/// All exons must come from one chromosome and strand. Row ids must be unique
/// across both inputs; output rows carry them so callers can reattach any
/// other data.
pub fn shorten_gaps(
    exons: &[FeatureRow],
    introns: &[FeatureRow],
    grouping: &Grouping,
    options: &CompressOptions,
) -> Result<Vec<RescaledRow>> {
    let start = Instant::now();
    options.validate()?;
    check_inputs(exons, introns)?;

    let introns = trim_introns(introns);
    let gaps = merge_and_find_gaps(exons)?;

    let classification = classify_gaps(&introns, &gaps);
    let introns_shortened = compress(&introns, &gaps, &classification, grouping, options)?;

    let offsets = match grouping {
        Grouping::Ungrouped => None,
        Grouping::GroupedBy(_) => Some(start_offsets(exons, &gaps, grouping, options)?),
    };

    let rescaled = rescale(exons, &introns_shortened, offsets.as_ref(), grouping)?;
    debug!(
        "Shortened gaps for {} exons and {} introns in {:?}",
        exons.len(),
        introns.len(),
        start.elapsed()
    );
    Ok(rescaled)
}

/// Rows of one (chromosome, strand) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub exons: Vec<FeatureRow>,
    pub introns: Vec<FeatureRow>,
}

pub fn split_by_partition(exons: &[FeatureRow], introns: &[FeatureRow]) -> Vec<Partition> {
    let mut partitions: BTreeMap<(i64, Strand), Partition> = BTreeMap::new();
    for exon in exons {
        partitions
            .entry((exon.chr, exon.strand))
            .or_default()
            .exons
            .push(*exon);
    }
    for intron in introns {
        partitions
            .entry((intron.chr, intron.strand))
            .or_default()
            .introns
            .push(*intron);
    }
    partitions.into_values().collect()
}

/// Runs `shorten_gaps` on every partition in parallel. Results keep the
/// order of `partitions`.
pub fn shorten_gaps_partitioned(
    partitions: &[Partition],
    grouping: &Grouping,
    options: &CompressOptions,
) -> Result<Vec<Vec<RescaledRow>>> {
    partitions
        .par_iter()
        .map(|p| shorten_gaps(&p.exons, &p.introns, grouping, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::DEFAULT_TARGET_GAP_WIDTH;

    fn exon(idx: i64, start: i64, end: i64) -> FeatureRow {
        FeatureRow::new(idx, start, end, FeatureType::Exon)
    }

    fn intron(idx: i64, start: i64, end: i64) -> FeatureRow {
        FeatureRow::new(idx, start, end, FeatureType::Intron)
    }

    fn spans(rows: &[RescaledRow]) -> Vec<(i64, i64, i64)> {
        rows.iter().map(|r| (r.idx, r.start, r.end)).collect()
    }

    #[test]
    fn long_intron_is_shortened_to_target() {
        let exons = [exon(0, 100, 200), exon(1, 300, 400)];
        let introns = [intron(2, 200, 300)];
        let out = shorten_gaps(
            &exons,
            &introns,
            &Grouping::Ungrouped,
            &CompressOptions::with_target_gap_width(50),
        )
        .unwrap();
        assert_eq!(spans(&out), vec![(0, 1, 101), (2, 101, 152), (1, 152, 252)]);
    }

    #[test]
    fn short_intron_is_left_alone() {
        let exons = [exon(0, 100, 200), exon(1, 231, 300)];
        let introns = [intron(2, 200, 231)];
        let out = shorten_gaps(&exons, &introns, &Grouping::Ungrouped, &CompressOptions::default()).unwrap();
        // 30 intronic bases, below the default target
        assert_eq!(spans(&out), vec![(0, 1, 101), (2, 101, 132), (1, 132, 201)]);
        assert_eq!(DEFAULT_TARGET_GAP_WIDTH, 100);
    }

    #[test]
    fn single_exon_without_introns_starts_at_one() {
        let out = shorten_gaps(&[exon(0, 1000, 1049)], &[], &Grouping::Ungrouped, &CompressOptions::default()).unwrap();
        assert_eq!(spans(&out), vec![(0, 1, 50)]);
    }

    #[test]
    fn later_transcripts_are_offset_by_compressed_leading_space() {
        let exons = [
            exon(0, 100, 199).in_group(0),
            exon(1, 1000, 1099).in_group(0),
            exon(2, 1000, 1099).in_group(1),
        ];
        let introns = [intron(3, 199, 1000).in_group(0)];
        let options = CompressOptions::with_target_gap_width(100);
        let out = shorten_gaps(&exons, &introns, &Grouping::by(["tx"]), &options).unwrap();
        // the 800bp gap shrinks to 100 both inside transcript 0 and ahead of transcript 1
        assert_eq!(
            spans(&out),
            vec![(0, 1, 100), (3, 100, 201), (1, 201, 300), (2, 201, 300)]
        );
    }

    #[test]
    fn intron_table_with_exons_is_rejected() {
        let res = shorten_gaps(&[exon(0, 1, 10)], &[exon(1, 20, 30)], &Grouping::Ungrouped, &CompressOptions::default());
        assert!(matches!(res, Err(GapError::InvalidInput(_))));
    }

    #[test]
    fn duplicate_row_ids_are_rejected() {
        let res = shorten_gaps(&[exon(0, 1, 10)], &[intron(0, 10, 20)], &Grouping::Ungrouped, &CompressOptions::default());
        assert!(matches!(res, Err(GapError::InvalidInput(_))));
    }

    #[test]
    fn partitions_run_independently() {
        let exons = [
            exon(0, 100, 200),
            exon(1, 300, 400),
            exon(2, 100, 200).on(1, Strand::Forward),
        ];
        let introns = [intron(3, 200, 300)];
        let partitions = split_by_partition(&exons, &introns);
        assert_eq!(partitions.len(), 2);
        let out = shorten_gaps_partitioned(&partitions, &Grouping::Ungrouped, &CompressOptions::with_target_gap_width(50)).unwrap();
        assert_eq!(spans(&out[0]), vec![(0, 1, 101), (3, 101, 152), (1, 152, 252)]);
        assert_eq!(spans(&out[1]), vec![(2, 1, 101)]);
    }
}
