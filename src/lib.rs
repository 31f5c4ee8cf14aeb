//! Gene/transcript layout engine: compresses long intronic gaps and rescales
//! exon, intron and CDS coordinates into a compact space for drawing.

pub mod cds;
pub mod classify;
pub mod compress;
pub mod error;
pub mod frame;
pub mod introns;
pub mod merge;
pub mod rescale;
pub mod shorten;
pub mod sorts;
pub mod structs;

#[cfg(feature = "python")]
pub mod numpy_bindings;

pub use cds::{cds_exon_offsets, rescale_cds};
pub use classify::{classify_gaps, Classification, GapHit, ShortenType};
pub use compress::{
    compress, CompressOptions, PureWithinRule, DEFAULT_TARGET_GAP_WIDTH,
    FORCED_INTRON_RANK, FORCE_SECOND_INTRON_COMPRESSION,
};
pub use error::{GapError, Result};
pub use frame::{
    cds_exon_diff_df, rescale_cds_df, shorten_gaps_df, shorten_gaps_partitioned_df,
    to_introns_df, CdsOrdering,
};
pub use introns::{to_introns, tx_start_gaps, DerivedIntron};
pub use merge::merge_and_find_gaps;
pub use rescale::rescale;
pub use shorten::{shorten_gaps, shorten_gaps_partitioned, split_by_partition, Partition};
pub use structs::{
    CdsOffset, FeatureRow, FeatureType, Gap, Grouping, Interval, RescaledRow, ShortenedRow,
    Strand,
};
