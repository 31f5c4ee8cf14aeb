//! Table front end: validates polars `DataFrame`s, turns them into
//! `FeatureRow`s, runs the row pipeline and reattaches every other column.

use std::time::Instant;

use log::{debug, info};
use polars::prelude::*;
use radsort::sort_by_key;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::cds::cds_exon_offsets;
use crate::compress::CompressOptions;
use crate::error::{GapError, Result};
use crate::introns::to_introns;
use crate::shorten::shorten_gaps;
use crate::structs::{FeatureRow, FeatureType, Grouping, Strand};

pub const REQUIRED_COLUMNS: [&str; 4] = ["seqnames", "start", "end", "strand"];
const LEADING_COLUMNS: [&str; 4] = REQUIRED_COLUMNS;
const KEY_SEPARATOR: char = '\u{1f}';

/// Codes for chromosome names and group keys, shared by every table of one call.
#[derive(Debug, Default)]
struct Encoders {
    chrs: FxHashMap<String, i64>,
    groups: FxHashMap<String, i64>,
}

impl Encoders {
    /// Renumbers group codes so that they follow the sorted key values, and
    /// rewrites the codes of `tables` to match.
    fn sort_groups(&mut self, tables: &mut [&mut Vec<FeatureRow>]) {
        let mut keys: Vec<(&String, i64)> = self.groups.iter().map(|(k, &v)| (k, v)).collect();
        keys.sort();
        let remap: FxHashMap<i64, i64> = keys
            .into_iter()
            .enumerate()
            .map(|(rank, (_, code))| (code, rank as i64))
            .collect();

        for rows in tables.iter_mut() {
            for row in rows.iter_mut() {
                if let Some(&code) = remap.get(&row.group) {
                    row.group = code;
                }
            }
        }
        for code in self.groups.values_mut() {
            if let Some(&sorted) = remap.get(code) {
                *code = sorted;
            }
        }
    }
}

fn encode(map: &mut FxHashMap<String, i64>, key: String) -> i64 {
    let next = map.len() as i64;
    *map.entry(key).or_insert(next)
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

fn column_names(df: &DataFrame) -> Vec<PlSmallStr> {
    df.get_columns().iter().map(|c| c.name().clone()).collect()
}

fn require_columns(df: &DataFrame, table: &str, grouping: &Grouping) -> Result<()> {
    for name in REQUIRED_COLUMNS {
        if !has_column(df, name) {
            return Err(GapError::InvalidInput(format!(
                "{} table must have 'seqnames', 'start', 'end' and 'strand' columns, '{}' is missing",
                table, name
            )));
        }
    }
    for name in grouping.columns() {
        if !has_column(df, name) {
            return Err(GapError::MissingColumn(name.clone()));
        }
    }
    Ok(())
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn coordinate_values(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    column
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| GapError::InvalidInput(format!("'{}' is null in row {}", name, row)))
        })
        .collect()
}

/// One string per row joining the values of `columns`.
fn composite_keys(df: &DataFrame, columns: &[String]) -> Result<Vec<String>> {
    let mut keys = vec![String::new(); df.height()];
    for (i, name) in columns.iter().enumerate() {
        for (key, value) in keys.iter_mut().zip(string_values(df, name)?) {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(value.as_deref().unwrap_or(""));
        }
    }
    Ok(keys)
}

fn check_type_column(df: &DataFrame, feature: FeatureType, table: &str) -> Result<()> {
    if !has_column(df, "type") {
        return Ok(());
    }
    if let Some((row, value)) = string_values(df, "type")?
        .into_iter()
        .enumerate()
        .find(|(_, v)| v.as_deref() != Some(feature.as_str()))
    {
        return Err(GapError::InvalidInput(format!(
            "all 'type' values in the {} table must be '{}', row {} is {:?}",
            table,
            feature.as_str(),
            row,
            value
        )));
    }
    Ok(())
}

fn read_rows(
    df: &DataFrame,
    table: &str,
    feature: FeatureType,
    grouping: &Grouping,
    encoders: &mut Encoders,
    first_idx: i64,
) -> Result<Vec<FeatureRow>> {
    require_columns(df, table, grouping)?;

    let seqnames = string_values(df, "seqnames")?;
    let strands = string_values(df, "strand")?;
    let starts = coordinate_values(df, "start")?;
    let ends = coordinate_values(df, "end")?;
    let groups = composite_keys(df, grouping.columns())?;

    let mut rows = Vec::with_capacity(df.height());
    for (i, ((((seqname, strand), start), end), group)) in seqnames
        .into_iter()
        .zip(strands)
        .zip(starts)
        .zip(ends)
        .zip(groups)
        .enumerate()
    {
        let seqname = seqname.ok_or_else(|| {
            GapError::InvalidInput(format!("'seqnames' is null in row {} of the {} table", i, table))
        })?;
        let strand = Strand::parse(strand.as_deref().unwrap_or(""))?;
        rows.push(FeatureRow {
            idx: first_idx + i as i64,
            chr: encode(&mut encoders.chrs, seqname),
            strand,
            start,
            end,
            feature,
            group: encode(&mut encoders.groups, group),
        });
    }
    Ok(rows)
}

fn with_type(df: &DataFrame, feature: FeatureType) -> Result<DataFrame> {
    let mut df = df.clone();
    if !has_column(&df, "type") {
        df.with_column(Series::new("type".into(), vec![feature.as_str(); df.height()]))?;
    }
    Ok(df)
}

/// Gives both frames the union of their columns, in the same order and with
/// the dtypes of `first`, so that they can be stacked.
fn align_columns(first: &DataFrame, second: &DataFrame) -> Result<(DataFrame, DataFrame)> {
    let mut first = first.clone();
    let mut second = second.clone();

    let mut names = column_names(&first);
    for name in column_names(&second) {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    for name in &names {
        match (first.column(name.as_str()).ok(), second.column(name.as_str()).ok()) {
            (Some(a), Some(b)) if a.dtype() != b.dtype() => {
                let cast = b.cast(a.dtype())?;
                second.with_column(cast)?;
            }
            (Some(a), None) => {
                let nulls = Series::full_null(name.clone(), second.height(), a.dtype());
                second.with_column(nulls)?;
            }
            (None, Some(b)) => {
                let nulls = Series::full_null(name.clone(), first.height(), b.dtype());
                first.with_column(nulls)?;
            }
            _ => {}
        }
    }

    Ok((first.select(names.clone())?, second.select(names)?))
}

/// Moves `seqnames, start, end, strand` (those present) to the front.
fn leading_columns_first(df: &DataFrame) -> Result<DataFrame> {
    let mut names: Vec<PlSmallStr> = LEADING_COLUMNS
        .iter()
        .filter(|c| has_column(df, c))
        .map(|c| PlSmallStr::from(*c))
        .collect();
    names.extend(
        column_names(df)
            .into_iter()
            .filter(|n| !LEADING_COLUMNS.contains(&n.as_str())),
    );
    Ok(df.select(names)?)
}

fn take_rows(df: &DataFrame, rows: Vec<u32>) -> Result<DataFrame> {
    let idx_ca = UInt32Chunked::from_vec("idx".into(), rows);
    Ok(df.take(&idx_ca)?)
}

/// Table version of [`shorten_gaps`]: exons and introns of one chromosome and
/// strand in, rescaled rows with every input column out.
///
/// When grouped, groups appear in the order of their key values compared as
/// text (several grouping columns compare column by column).
pub fn shorten_gaps_df(
    exons: &DataFrame,
    introns: &DataFrame,
    grouping: &Grouping,
    options: &CompressOptions,
) -> Result<DataFrame> {
    check_type_column(introns, FeatureType::Intron, "introns")?;

    let mut encoders = Encoders::default();
    let mut exon_rows = read_rows(exons, "exons", FeatureType::Exon, grouping, &mut encoders, 0)?;
    let mut intron_rows = read_rows(
        introns,
        "introns",
        FeatureType::Intron,
        grouping,
        &mut encoders,
        exons.height() as i64,
    )?;
    encoders.sort_groups(&mut [&mut exon_rows, &mut intron_rows]);

    let rescaled = shorten_gaps(&exon_rows, &intron_rows, grouping, options)?;

    let (exons, introns) = align_columns(
        &with_type(exons, FeatureType::Exon)?,
        &with_type(introns, FeatureType::Intron)?,
    )?;
    let combined = exons.vstack(&introns)?;

    let mut out = take_rows(&combined, rescaled.iter().map(|r| r.idx as u32).collect())?;
    out.with_column(Series::new(
        "start".into(),
        rescaled.iter().map(|r| r.start).collect::<Vec<i64>>(),
    ))?;
    out.with_column(Series::new(
        "end".into(),
        rescaled.iter().map(|r| r.end).collect::<Vec<i64>>(),
    ))?;

    leading_columns_first(&out)
}

fn partition_keys(df: &DataFrame, partition_by: &[String]) -> Result<Vec<String>> {
    let mut columns = vec!["seqnames".to_string(), "strand".to_string()];
    columns.extend(partition_by.iter().cloned());
    for name in &columns {
        if !has_column(df, name) {
            return Err(GapError::MissingColumn(name.clone()));
        }
    }
    composite_keys(df, &columns)
}

/// Runs [`shorten_gaps_df`] separately, and in parallel, on every
/// (seqnames, strand, `partition_by`...) partition. Partitions appear in the
/// output in order of first appearance in `exons`.
pub fn shorten_gaps_partitioned_df(
    exons: &DataFrame,
    introns: &DataFrame,
    grouping: &Grouping,
    partition_by: &[String],
    options: &CompressOptions,
) -> Result<DataFrame> {
    let start = Instant::now();

    let mut order: Vec<String> = Vec::new();
    let mut members: FxHashMap<String, (Vec<u32>, Vec<u32>)> = FxHashMap::default();
    for (i, key) in partition_keys(exons, partition_by)?.into_iter().enumerate() {
        if !members.contains_key(&key) {
            order.push(key.clone());
        }
        members.entry(key).or_default().0.push(i as u32);
    }
    for (i, key) in partition_keys(introns, partition_by)?.into_iter().enumerate() {
        if !members.contains_key(&key) {
            order.push(key.clone());
        }
        members.entry(key).or_default().1.push(i as u32);
    }

    if order.len() <= 1 {
        return shorten_gaps_df(exons, introns, grouping, options);
    }

    let frames = order
        .par_iter()
        .map(|key| {
            let (exon_rows, intron_rows) = &members[key];
            let part_exons = take_rows(exons, exon_rows.clone())?;
            let part_introns = take_rows(introns, intron_rows.clone())?;
            shorten_gaps_df(&part_exons, &part_introns, grouping, options)
        })
        .collect::<Result<Vec<DataFrame>>>()?;

    let mut frames = frames.into_iter();
    let mut out = match frames.next() {
        Some(first) => first,
        None => return shorten_gaps_df(exons, introns, grouping, options),
    };
    for frame in frames {
        out.vstack_mut(&frame)?;
    }

    info!(
        "Shortened gaps in {} partitions ({} rows) in {:?}",
        order.len(),
        out.height(),
        start.elapsed()
    );
    Ok(out)
}

/// Derives introns from an exon table. The output carries `seqnames`,
/// `strand` and the grouping columns of the upstream exon.
pub fn to_introns_df(exons: &DataFrame, grouping: &Grouping) -> Result<DataFrame> {
    let mut encoders = Encoders::default();
    let mut rows = read_rows(exons, "exons", FeatureType::Exon, grouping, &mut encoders, 0)?;
    encoders.sort_groups(&mut [&mut rows]);
    let introns = to_introns(&rows, grouping, 0);
    debug!("Derived {} introns from {} exons", introns.len(), rows.len());

    let mut keep: Vec<PlSmallStr> = vec!["seqnames".into(), "strand".into()];
    keep.extend(grouping.columns().iter().map(|c| PlSmallStr::from(c.as_str())));

    let upstream = introns.iter().map(|i| i.upstream_exon as u32).collect();
    let mut out = take_rows(&exons.select(keep)?, upstream)?;
    out.with_column(Series::new(
        "start".into(),
        introns.iter().map(|i| i.row.start).collect::<Vec<i64>>(),
    ))?;
    out.with_column(Series::new(
        "end".into(),
        introns.iter().map(|i| i.row.end).collect::<Vec<i64>>(),
    ))?;
    out.with_column(Series::new(
        "type".into(),
        vec![FeatureType::Intron.as_str(); introns.len()],
    ))?;

    leading_columns_first(&out)
}

/// For every CDS row that lies inside an exon of its group, its distances
/// `d_start`/`d_end` from that exon's boundaries. `start` and `end` are
/// dropped; every other CDS column is kept for joining.
///
/// Exons of different transcripts overlap, so the grouping columns must say
/// which transcript every row belongs to.
pub fn cds_exon_diff_df(exons: &DataFrame, cds: &DataFrame, grouping: &Grouping) -> Result<DataFrame> {
    if !grouping.is_grouped() {
        return Err(GapError::InvalidInput(
            "CDS offsets need grouping columns identifying the transcript of each row".to_string(),
        ));
    }
    let mut encoders = Encoders::default();
    let exon_rows = read_rows(exons, "exons", FeatureType::Exon, grouping, &mut encoders, 0)?;
    let cds_rows = read_rows(cds, "CDS", FeatureType::Cds, grouping, &mut encoders, 0)?;

    let offsets = cds_exon_offsets(&exon_rows, &cds_rows, grouping);

    let mut out = take_rows(cds, offsets.iter().map(|o| o.cds.idx as u32).collect())?;
    out = out.drop("start")?.drop("end")?;
    out.with_column(Series::new(
        "d_start".into(),
        offsets.iter().map(|o| o.d_start).collect::<Vec<i64>>(),
    ))?;
    out.with_column(Series::new(
        "d_end".into(),
        offsets.iter().map(|o| o.d_end).collect::<Vec<i64>>(),
    ))?;
    Ok(out)
}

/// Identity column of the CDS output and the order its values should follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdsOrdering {
    pub identity_column: String,
    pub factor_order: Vec<String>,
}

impl CdsOrdering {
    pub fn new(factor_order: Vec<String>) -> Self {
        Self {
            identity_column: "transcript_id".to_string(),
            factor_order,
        }
    }
}

fn drop_if_present(mut df: DataFrame, names: &[&str]) -> Result<DataFrame> {
    for name in names {
        if has_column(&df, name) {
            df = df.drop(name)?;
        }
    }
    Ok(df)
}

/// Orders rows by the position of their identity value in `factor_order`,
/// nulls the values outside it and stores the column as a categorical.
fn apply_factor_order(df: &DataFrame, ordering: &CdsOrdering) -> Result<DataFrame> {
    let rank: FxHashMap<&str, usize> = ordering
        .factor_order
        .iter()
        .enumerate()
        .map(|(i, v)| (v.as_str(), i))
        .collect();

    let values = string_values(df, &ordering.identity_column)?;
    let ranks: Vec<usize> = values
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|v| rank.get(v).copied())
                .unwrap_or(ordering.factor_order.len())
        })
        .collect();

    let mut order: Vec<u32> = (0..df.height() as u32).collect();
    sort_by_key(&mut order, |&i| ranks[i as usize]);

    let identity: Vec<Option<&str>> = order
        .iter()
        .map(|&i| {
            values[i as usize]
                .as_deref()
                .filter(|v| rank.contains_key(v))
        })
        .collect();
    let categorical = Series::new(ordering.identity_column.as_str().into(), identity)
        .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))?;

    let mut out = take_rows(df, order)?;
    out.with_column(categorical)?;
    Ok(out)
}

/// Places CDS rows on the rescaled exon coordinates.
///
/// `cds_exon_diff` carries `d_start`/`d_end` and the columns that identify
/// each CDS's parent exon; `rescaled_exons` is the output of
/// [`shorten_gaps_df`] restricted to exons. The tables are left-joined on every
/// column they share.
///
/// The output is reordered: rows are stably sorted by the position of their
/// identity value in `ordering.factor_order`, with values outside it last and
/// nulled. A polars Categorical does not carry a category order, so the row
/// order is where the factor order shows.
pub fn rescale_cds_df(
    cds_exon_diff: &DataFrame,
    rescaled_exons: &DataFrame,
    ordering: &CdsOrdering,
) -> Result<DataFrame> {
    for name in ["d_start", "d_end"] {
        if !has_column(cds_exon_diff, name) {
            return Err(GapError::MissingColumn(name.to_string()));
        }
    }
    for name in ["start", "end"] {
        if !has_column(rescaled_exons, name) {
            return Err(GapError::MissingColumn(name.to_string()));
        }
    }

    let mut cds = drop_if_present(cds_exon_diff.clone(), &["c_start", "c_end", "e_start", "e_end"])?;
    cds.with_column(Series::new("type".into(), vec![FeatureType::Cds.as_str(); cds.height()]))?;

    let mut exons = drop_if_present(rescaled_exons.clone(), &["type"])?;
    exons.rename("start", "e_start".into())?;
    exons.rename("end", "e_end".into())?;
    // polars 0.46 `rename` does not invalidate the cached schema.
    exons.clear_schema();

    let common: Vec<PlSmallStr> = column_names(&cds)
        .into_iter()
        .filter(|name| has_column(&exons, name.as_str()))
        .collect();
    if common.is_empty() {
        return Err(GapError::JoinKey(
            "no common columns to perform join on, both tables need shared key columns".to_string(),
        ));
    }
    if !has_column(&cds, &ordering.identity_column) && !has_column(&exons, &ordering.identity_column) {
        return Err(GapError::MissingColumn(ordering.identity_column.clone()));
    }
    debug!("Joining CDS rows to rescaled exons on {:?}", common);

    let on: Vec<Expr> = common.iter().map(|name| col(name.clone())).collect();
    let joined = cds
        .lazy()
        .join(exons.lazy(), on.clone(), on, JoinArgs::new(JoinType::Left))
        .with_columns([
            (col("e_start") + col("d_start")).alias("start"),
            (col("e_end") - col("d_end")).alias("end"),
        ])
        .collect()?;

    let joined = drop_if_present(joined, &["e_start", "e_end", "d_start", "d_end"])?;
    let ordered = apply_factor_order(&joined, ordering)?;
    leading_columns_first(&ordered)
}
