//! Table-level pipeline: polars frames in, rescaled frames out.

use polars::prelude::*;
use rutranscript::{
    cds_exon_diff_df, rescale_cds_df, shorten_gaps_df, shorten_gaps_partitioned_df,
    to_introns_df, CdsOrdering, CompressOptions, GapError, Grouping,
};

fn i64_values(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn str_values(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or("<null>").to_string())
        .collect()
}

fn names(df: &DataFrame) -> Vec<String> {
    df.get_columns().iter().map(|c| c.name().to_string()).collect()
}

fn two_transcripts() -> DataFrame {
    df!(
        "seqnames" => ["21", "21", "21", "21"],
        "start" => [100i64, 1000, 1000, 1500],
        "end" => [199i64, 1099, 1099, 1599],
        "strand" => ["+", "+", "+", "+"],
        "transcript_id" => ["tx1", "tx1", "tx2", "tx2"],
        "exon_number" => [1i64, 2, 1, 2],
    )
    .unwrap()
}

fn shortened_two_transcripts() -> DataFrame {
    let exons = two_transcripts();
    let grouping = Grouping::by(["transcript_id"]);
    let introns = to_introns_df(&exons, &grouping).unwrap();
    shorten_gaps_df(&exons, &introns, &grouping, &CompressOptions::default()).unwrap()
}

#[test]
fn ungrouped_intron_is_shortened_and_columns_lead_with_coordinates() {
    let exons = df!(
        "seqnames" => ["chr1", "chr1"],
        "start" => [100i64, 300],
        "end" => [200i64, 400],
        "strand" => ["+", "+"],
        "gene_name" => ["G", "G"],
    )
    .unwrap();
    let introns = df!(
        "seqnames" => ["chr1"],
        "start" => [200i64],
        "end" => [300i64],
        "strand" => ["+"],
    )
    .unwrap();

    let out = shorten_gaps_df(
        &exons,
        &introns,
        &Grouping::Ungrouped,
        &CompressOptions::with_target_gap_width(50),
    )
    .unwrap();

    assert_eq!(names(&out)[..4], ["seqnames", "start", "end", "strand"]);
    assert_eq!(i64_values(&out, "start"), vec![1, 101, 152]);
    assert_eq!(i64_values(&out, "end"), vec![101, 152, 252]);
    assert_eq!(str_values(&out, "type"), vec!["exon", "intron", "exon"]);
    assert_eq!(str_values(&out, "gene_name"), vec!["G", "<null>", "G"]);
}

#[test]
fn derived_introns_share_a_base_with_each_exon() {
    let introns = to_introns_df(&two_transcripts(), &Grouping::by(["transcript_id"])).unwrap();
    assert_eq!(i64_values(&introns, "start"), vec![199, 1099]);
    assert_eq!(i64_values(&introns, "end"), vec![1000, 1500]);
    assert_eq!(str_values(&introns, "transcript_id"), vec!["tx1", "tx2"]);
    assert_eq!(str_values(&introns, "type"), vec!["intron", "intron"]);
}

#[test]
fn grouped_transcripts_stay_aligned_on_shared_exons() {
    let out = shortened_two_transcripts();

    assert_eq!(
        str_values(&out, "transcript_id"),
        vec!["tx1", "tx1", "tx1", "tx2", "tx2", "tx2"]
    );
    assert_eq!(
        str_values(&out, "type"),
        vec!["exon", "intron", "exon", "exon", "intron", "exon"]
    );
    assert_eq!(i64_values(&out, "start"), vec![1, 100, 201, 201, 300, 401]);
    assert_eq!(i64_values(&out, "end"), vec![100, 201, 300, 300, 401, 500]);
}

#[test]
fn cds_rows_follow_their_rescaled_exons() {
    let rescaled_exons = shortened_two_transcripts()
        .lazy()
        .filter(col("type").eq(lit("exon")))
        .collect()
        .unwrap();
    let cds = df!(
        "seqnames" => ["21", "21", "21"],
        "start" => [150i64, 1000, 1520],
        "end" => [199i64, 1050, 1599],
        "strand" => ["+", "+", "+"],
        "transcript_id" => ["tx1", "tx1", "tx2"],
        "exon_number" => [1i64, 2, 2],
    )
    .unwrap();

    let grouping = Grouping::by(["transcript_id"]);
    let diff = cds_exon_diff_df(&two_transcripts(), &cds, &grouping).unwrap();
    assert_eq!(i64_values(&diff, "d_start"), vec![50, 0, 20]);
    assert_eq!(i64_values(&diff, "d_end"), vec![0, 49, 0]);

    let ordering = CdsOrdering::new(vec!["tx2".to_string(), "tx1".to_string()]);
    let out = rescale_cds_df(&diff, &rescaled_exons, &ordering).unwrap();

    assert_eq!(names(&out)[..4], ["seqnames", "start", "end", "strand"]);
    assert_eq!(str_values(&out, "transcript_id"), vec!["tx2", "tx1", "tx1"]);
    assert_eq!(i64_values(&out, "start"), vec![421, 51, 201]);
    assert_eq!(i64_values(&out, "end"), vec![500, 100, 251]);
    assert_eq!(str_values(&out, "type"), vec!["CDS", "CDS", "CDS"]);
    assert!(matches!(
        out.column("transcript_id").unwrap().dtype(),
        DataType::Categorical(_, _)
    ));
}

#[test]
fn cds_values_outside_the_factor_order_go_last_as_nulls() {
    let rescaled_exons = shortened_two_transcripts()
        .lazy()
        .filter(col("type").eq(lit("exon")))
        .collect()
        .unwrap();
    let cds = df!(
        "seqnames" => ["21", "21", "21"],
        "start" => [1520i64, 150, 1000],
        "end" => [1599i64, 199, 1050],
        "strand" => ["+", "+", "+"],
        "transcript_id" => ["tx2", "tx1", "tx1"],
        "exon_number" => [2i64, 1, 2],
    )
    .unwrap();

    let diff = cds_exon_diff_df(&two_transcripts(), &cds, &Grouping::by(["transcript_id"])).unwrap();
    let out = rescale_cds_df(&diff, &rescaled_exons, &CdsOrdering::new(vec!["tx1".to_string()])).unwrap();

    assert_eq!(str_values(&out, "transcript_id"), vec!["tx1", "tx1", "<null>"]);
    assert_eq!(i64_values(&out, "start"), vec![51, 201, 421]);
    assert_eq!(i64_values(&out, "end"), vec![100, 251, 500]);
}

fn overlapping_transcripts() -> (DataFrame, DataFrame) {
    let exons = df!(
        "seqnames" => ["1", "1"],
        "start" => [100i64, 140],
        "end" => [200i64, 300],
        "strand" => ["+", "+"],
        "transcript_id" => ["tx1", "tx2"],
    )
    .unwrap();
    let cds = df!(
        "seqnames" => ["1"],
        "start" => [150i64],
        "end" => [160i64],
        "strand" => ["+"],
        "transcript_id" => ["tx2"],
    )
    .unwrap();
    (exons, cds)
}

#[test]
fn cds_offsets_come_from_the_exon_of_the_same_transcript() {
    let (exons, cds) = overlapping_transcripts();
    let diff = cds_exon_diff_df(&exons, &cds, &Grouping::by(["transcript_id"])).unwrap();
    assert_eq!(str_values(&diff, "transcript_id"), vec!["tx2"]);
    assert_eq!(i64_values(&diff, "d_start"), vec![10]);
    assert_eq!(i64_values(&diff, "d_end"), vec![140]);
}

#[test]
fn cds_offsets_without_grouping_are_rejected() {
    let (exons, cds) = overlapping_transcripts();
    let res = cds_exon_diff_df(&exons, &cds, &Grouping::Ungrouped);
    assert!(matches!(res, Err(GapError::InvalidInput(_))));
}

#[test]
fn groups_are_laid_out_in_key_order() {
    let exons = df!(
        "seqnames" => ["21", "21", "21", "21"],
        "start" => [1000i64, 1500, 100, 1000],
        "end" => [1099i64, 1599, 199, 1099],
        "strand" => ["+", "+", "+", "+"],
        "transcript_id" => ["tx2", "tx2", "tx1", "tx1"],
    )
    .unwrap();
    let grouping = Grouping::by(["transcript_id"]);
    let introns = to_introns_df(&exons, &grouping).unwrap();
    let out = shorten_gaps_df(&exons, &introns, &grouping, &CompressOptions::default()).unwrap();

    assert_eq!(
        str_values(&out, "transcript_id"),
        vec!["tx1", "tx1", "tx1", "tx2", "tx2", "tx2"]
    );
    assert_eq!(i64_values(&out, "start"), vec![1, 100, 201, 201, 300, 401]);
}

#[test]
fn cds_without_shared_columns_is_a_join_error() {
    let diff = df!("d_start" => [0i64], "d_end" => [0i64], "cds_name" => ["a"]).unwrap();
    let exons = df!("start" => [1i64], "end" => [10i64], "exon_name" => ["b"]).unwrap();
    let res = rescale_cds_df(&diff, &exons, &CdsOrdering::new(vec![]));
    assert!(matches!(res, Err(GapError::JoinKey(_))));
}

#[test]
fn cds_without_identity_column_is_rejected() {
    let diff = df!("d_start" => [0i64], "d_end" => [0i64], "gene" => ["g"]).unwrap();
    let exons = df!("start" => [1i64], "end" => [10i64], "gene" => ["g"]).unwrap();
    let res = rescale_cds_df(&diff, &exons, &CdsOrdering::new(vec![]));
    assert!(matches!(res, Err(GapError::MissingColumn(c)) if c == "transcript_id"));
}

#[test]
fn missing_required_column_is_invalid_input() {
    let exons = df!("seqnames" => ["1"], "start" => [1i64], "end" => [10i64]).unwrap();
    let introns = df!("seqnames" => ["1"], "start" => [1i64], "end" => [10i64]).unwrap();
    let res = shorten_gaps_df(&exons, &introns, &Grouping::Ungrouped, &CompressOptions::default());
    assert!(matches!(res, Err(GapError::InvalidInput(_))));
}

#[test]
fn intron_table_must_only_hold_introns() {
    let exons = two_transcripts();
    let introns = df!(
        "seqnames" => ["21"],
        "start" => [199i64],
        "end" => [1000i64],
        "strand" => ["+"],
        "transcript_id" => ["tx1"],
        "type" => ["exon"],
    )
    .unwrap();
    let res = shorten_gaps_df(
        &exons,
        &introns,
        &Grouping::by(["transcript_id"]),
        &CompressOptions::default(),
    );
    assert!(matches!(res, Err(GapError::InvalidInput(_))));
}

#[test]
fn mixed_chromosomes_need_partitioning() {
    let exons = df!(
        "seqnames" => ["1", "1", "2"],
        "start" => [100i64, 300, 5000],
        "end" => [200i64, 400, 5100],
        "strand" => ["+", "+", "-"],
    )
    .unwrap();
    let introns = df!(
        "seqnames" => ["1"],
        "start" => [200i64],
        "end" => [300i64],
        "strand" => ["+"],
    )
    .unwrap();
    let options = CompressOptions::with_target_gap_width(50);

    let res = shorten_gaps_df(&exons, &introns, &Grouping::Ungrouped, &options);
    assert!(matches!(res, Err(GapError::InvalidInput(_))));

    let out = shorten_gaps_partitioned_df(&exons, &introns, &Grouping::Ungrouped, &[], &options).unwrap();
    assert_eq!(str_values(&out, "seqnames"), vec!["1", "1", "1", "2"]);
    assert_eq!(i64_values(&out, "start"), vec![1, 101, 152, 1]);
    assert_eq!(i64_values(&out, "end"), vec![101, 152, 252, 101]);
}
