use std::fmt;

use crate::error::{GapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(GapError::InvalidInput(format!(
                "strand must be '+' or '-', got '{}'",
                other
            ))),
        }
    }

    pub fn from_flag(forward: bool) -> Self {
        if forward {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Exon,
    Intron,
    Cds,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Exon => "exon",
            FeatureType::Intron => "intron",
            FeatureType::Cds => "CDS",
        }
    }
}

/// Which columns, if any, split the rows into independently laid out units
/// (usually one transcript each).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Grouping {
    #[default]
    Ungrouped,
    GroupedBy(Vec<String>),
}

impl Grouping {
    pub fn by<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            Grouping::Ungrouped
        } else {
            Grouping::GroupedBy(columns)
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Grouping::GroupedBy(_))
    }

    pub fn columns(&self) -> &[String] {
        match self {
            Grouping::Ungrouped => &[],
            Grouping::GroupedBy(columns) => columns,
        }
    }

    /// Group code a row participates under. Ungrouped input is one implicit group.
    pub fn key_of(&self, row: &FeatureRow) -> i64 {
        match self {
            Grouping::Ungrouped => 0,
            Grouping::GroupedBy(_) => row.group,
        }
    }
}

/// Closed genomic interval on an encoded chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub chr: i64,
    pub strand: Strand,
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn width(&self) -> i64 {
        self.end - self.start + 1
    }
}

/// One exon, intron or CDS row. `idx` is a stable identifier that survives
/// every sort and join in the pipeline; `group` is the encoded group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRow {
    pub idx: i64,
    pub chr: i64,
    pub strand: Strand,
    pub start: i64,
    pub end: i64,
    pub feature: FeatureType,
    pub group: i64,
}

impl FeatureRow {
    pub fn new(idx: i64, start: i64, end: i64, feature: FeatureType) -> Self {
        Self {
            idx,
            chr: 0,
            strand: Strand::Forward,
            start,
            end,
            feature,
            group: 0,
        }
    }

    pub fn in_group(mut self, group: i64) -> Self {
        self.group = group;
        self
    }

    pub fn on(mut self, chr: i64, strand: Strand) -> Self {
        self.chr = chr;
        self.strand = strand;
        self
    }

    pub fn width(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn interval(&self) -> Interval {
        Interval {
            chr: self.chr,
            strand: self.strand,
            start: self.start,
            end: self.end,
        }
    }
}

/// Space between two consecutive merged exon blocks. `idx` is the gap's
/// position in the list returned by the gap extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub idx: usize,
    pub start: i64,
    pub end: i64,
}

impl Gap {
    pub fn width(&self) -> i64 {
        self.end - self.start + 1
    }
}

/// A row together with the width it will occupy in rescaled space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortenedRow {
    pub row: FeatureRow,
    pub width: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescaledRow {
    pub idx: i64,
    pub chr: i64,
    pub strand: Strand,
    pub feature: FeatureType,
    pub group: i64,
    pub start: i64,
    pub end: i64,
}

/// Distance of a CDS from the boundaries of its parent exon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdsOffset {
    pub cds: FeatureRow,
    pub exon_idx: i64,
    pub d_start: i64,
    pub d_end: i64,
}
