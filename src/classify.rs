use rustc_hash::{FxHashMap, FxHashSet};

use crate::structs::{FeatureRow, Gap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortenType {
    None,
    Equal,
    PureWithin,
}

/// Links a row (by its stable id) to a gap (by its index in the gap list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GapHit {
    pub row_idx: i64,
    pub gap_idx: usize,
}

/// Result of matching intron-like rows against the gap list.
///
/// A row listed in `equal` never appears in `pure_within`. A row may appear
/// in `pure_within` several times, once per gap it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub equal: Vec<GapHit>,
    pub pure_within: Vec<GapHit>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.equal.is_empty() && self.pure_within.is_empty()
    }

    pub fn shorten_types(&self) -> FxHashMap<i64, ShortenType> {
        let mut types = FxHashMap::default();
        for hit in &self.pure_within {
            types.insert(hit.row_idx, ShortenType::PureWithin);
        }
        for hit in &self.equal {
            types.insert(hit.row_idx, ShortenType::Equal);
        }
        types
    }

    /// Gap indices each `pure_within` row contains.
    pub fn within_gaps(&self) -> FxHashMap<i64, Vec<usize>> {
        let mut gaps: FxHashMap<i64, Vec<usize>> = FxHashMap::default();
        for hit in &self.pure_within {
            gaps.entry(hit.row_idx).or_default().push(hit.gap_idx);
        }
        gaps
    }
}

/// Compares every row with every gap.
///
/// Exact coordinate equality gives an `equal` hit; a gap lying inside the row
/// gives a `pure_within` candidate. Candidates for rows that are `equal` to
/// any gap are dropped, so all pairs must be seen before deciding.
pub fn classify_gaps(rows: &[FeatureRow], gaps: &[Gap]) -> Classification {
    let mut equal = Vec::new();
    let mut within = Vec::new();

    for gap in gaps {
        for row in rows {
            let hit = GapHit {
                row_idx: row.idx,
                gap_idx: gap.idx,
            };
            if gap.start == row.start && gap.end == row.end {
                equal.push(hit);
            } else if gap.start >= row.start && gap.end <= row.end {
                within.push(hit);
            }
        }
    }

    let equal_rows: FxHashSet<i64> = equal.iter().map(|h| h.row_idx).collect();
    let pure_within = within
        .into_iter()
        .filter(|h| !equal_rows.contains(&h.row_idx))
        .collect();

    Classification { equal, pure_within }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::FeatureType;

    fn intron(idx: i64, start: i64, end: i64) -> FeatureRow {
        FeatureRow::new(idx, start, end, FeatureType::Intron)
    }

    fn gap(idx: usize, start: i64, end: i64) -> Gap {
        Gap { idx, start, end }
    }

    #[test]
    fn exact_match_is_equal() {
        let c = classify_gaps(&[intron(7, 201, 299)], &[gap(0, 201, 299)]);
        assert_eq!(c.equal, vec![GapHit { row_idx: 7, gap_idx: 0 }]);
        assert!(c.pure_within.is_empty());
        assert_eq!(c.shorten_types()[&7], ShortenType::Equal);
    }

    #[test]
    fn row_spanning_several_gaps_keeps_every_hit() {
        let rows = [intron(0, 100, 1000)];
        let gaps = [gap(0, 201, 299), gap(1, 401, 599), gap(2, 1200, 1300)];
        let c = classify_gaps(&rows, &gaps);
        assert!(c.equal.is_empty());
        assert_eq!(c.within_gaps()[&0], vec![0, 1]);
        assert_eq!(c.shorten_types()[&0], ShortenType::PureWithin);
    }

    #[test]
    fn equal_takes_precedence_over_containment() {
        let rows = [intron(0, 201, 599)];
        let gaps = [gap(0, 201, 599), gap(1, 300, 400)];
        let c = classify_gaps(&rows, &gaps);
        assert_eq!(c.equal.len(), 1);
        assert!(c.pure_within.is_empty());
    }

    #[test]
    fn partial_overlap_is_unmatched() {
        let c = classify_gaps(&[intron(0, 250, 350)], &[gap(0, 201, 299)]);
        assert!(c.is_empty());
        assert!(c.shorten_types().get(&0).is_none());
    }
}
