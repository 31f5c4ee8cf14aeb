use std::collections::BTreeMap;

use crate::sorts;
use crate::structs::{FeatureRow, FeatureType, Grouping};

/// An intron placed between two consecutive exons of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedIntron {
    pub row: FeatureRow,
    pub upstream_exon: i64,
    pub downstream_exon: i64,
}

/// Derives introns from exons: for every pair of consecutive exons (by start)
/// within a group, the intron runs from the end of the first to the start of
/// the second, sharing one base with each. Pairs with no intronic base
/// between them yield nothing. New rows are numbered from `first_idx`.
pub fn to_introns(exons: &[FeatureRow], grouping: &Grouping, first_idx: i64) -> Vec<DerivedIntron> {
    let mut sorted = exons.to_vec();
    sorts::sort_rows(&mut sorted, grouping);

    let mut introns = Vec::with_capacity(sorted.len().saturating_sub(1));
    for pair in sorted.windows(2) {
        let (up, down) = (&pair[0], &pair[1]);
        if grouping.key_of(up) != grouping.key_of(down)
            || up.chr != down.chr
            || up.strand != down.strand
        {
            continue;
        }
        if down.start - up.end <= 1 {
            continue;
        }
        let row = FeatureRow {
            idx: first_idx + introns.len() as i64,
            chr: up.chr,
            strand: up.strand,
            start: up.end,
            end: down.start,
            feature: FeatureType::Intron,
            group: up.group,
        };
        introns.push(DerivedIntron {
            row,
            upstream_exon: up.idx,
            downstream_exon: down.idx,
        });
    }
    introns
}

/// One row per group spanning from the leftmost exon of all groups to the
/// first exon of that group. The row's `idx` is the group code.
pub fn tx_start_gaps(exons: &[FeatureRow], grouping: &Grouping) -> Vec<FeatureRow> {
    let Some(first) = exons.first() else {
        return Vec::new();
    };
    let overall_start = exons.iter().map(|e| e.start).min().unwrap_or(first.start);

    let mut group_starts: BTreeMap<i64, i64> = BTreeMap::new();
    for exon in exons {
        let start = group_starts.entry(grouping.key_of(exon)).or_insert(exon.start);
        *start = (*start).min(exon.start);
    }

    group_starts
        .into_iter()
        .map(|(group, tx_start)| FeatureRow {
            idx: group,
            chr: first.chr,
            strand: first.strand,
            start: overall_start,
            end: tx_start,
            feature: FeatureType::Intron,
            group,
        })
        .collect()
}
