use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{GapError, Result};
use crate::structs::{CdsOffset, FeatureRow, FeatureType, Grouping, RescaledRow};

/// Pairs each CDS with the exon of its group, chromosome and strand that
/// contains it and records how far the CDS boundaries sit inside that exon.
pub fn cds_exon_offsets(exons: &[FeatureRow], cds: &[FeatureRow], grouping: &Grouping) -> Vec<CdsOffset> {
    let mut offsets = Vec::with_capacity(cds.len());
    for c in cds {
        let parent = exons.iter().find(|e| {
            e.chr == c.chr
                && e.strand == c.strand
                && grouping.key_of(e) == grouping.key_of(c)
                && e.start <= c.start
                && c.end <= e.end
        });
        match parent {
            Some(exon) => offsets.push(CdsOffset {
                cds: *c,
                exon_idx: exon.idx,
                d_start: (exon.start - c.start).abs(),
                d_end: (exon.end - c.end).abs(),
            }),
            None => debug!("CDS row {} ({}-{}) lies in no exon of its group", c.idx, c.start, c.end),
        }
    }
    offsets
}

/// Moves every CDS onto the rescaled coordinates of its parent exon.
pub fn rescale_cds(offsets: &[CdsOffset], rescaled_exons: &[RescaledRow]) -> Result<Vec<RescaledRow>> {
    let exons: FxHashMap<i64, &RescaledRow> = rescaled_exons
        .iter()
        .filter(|r| r.feature != FeatureType::Intron)
        .map(|r| (r.idx, r))
        .collect();

    offsets
        .iter()
        .map(|offset| {
            let exon = exons.get(&offset.exon_idx).ok_or_else(|| {
                GapError::JoinKey(format!(
                    "CDS row {} refers to exon {} which is not among the rescaled exons",
                    offset.cds.idx, offset.exon_idx
                ))
            })?;
            Ok(RescaledRow {
                idx: offset.cds.idx,
                chr: offset.cds.chr,
                strand: offset.cds.strand,
                feature: FeatureType::Cds,
                group: offset.cds.group,
                start: exon.start + offset.d_start,
                end: exon.end - offset.d_end,
            })
        })
        .collect()
}
