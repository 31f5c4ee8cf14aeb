use radsort::sort_by_key;

use crate::structs::{FeatureRow, Grouping, Interval, ShortenedRow};

// radsort is a stable LSD sort, so keys are applied least significant first.

pub fn sort_rows(rows: &mut [FeatureRow], grouping: &Grouping) {
    sort_by_key(rows, |r| r.end);
    sort_by_key(rows, |r| r.start);
    if grouping.is_grouped() {
        sort_by_key(rows, |r| r.group);
    }
}

pub fn sort_shortened_rows(rows: &mut [ShortenedRow], grouping: &Grouping) {
    sort_by_key(rows, |r| r.row.end);
    sort_by_key(rows, |r| r.row.start);
    if grouping.is_grouped() {
        sort_by_key(rows, |r| r.row.group);
    }
}

pub fn build_sorted_intervals(rows: &[FeatureRow]) -> Vec<Interval> {
    let mut intervals: Vec<Interval> = rows.iter().map(FeatureRow::interval).collect();

    sort_by_key(&mut intervals, |i| i.end);
    sort_by_key(&mut intervals, |i| i.start);

    intervals
}

/// Positions of `rows` ordered by (group, start), ties kept in input order.
pub fn group_start_order(rows: &[FeatureRow], grouping: &Grouping) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    sort_by_key(&mut order, |&i| rows[i].start);
    if grouping.is_grouped() {
        sort_by_key(&mut order, |&i| rows[i].group);
    }
    order
}
