use clap::Parser;
use log::info;
use polars::prelude::*;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use rutranscript::compress::{CompressOptions, PureWithinRule, DEFAULT_TARGET_GAP_WIDTH};
use rutranscript::frame::{
    cds_exon_diff_df, rescale_cds_df, shorten_gaps_partitioned_df, to_introns_df, CdsOrdering,
};
use rutranscript::structs::Grouping;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Columns identifying a transcript (repeat for several columns)
    #[clap(short = 'g', long = "group", value_parser)]
    group: Vec<String>,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Compact transcript layouts: shrinks long introns and rescales coordinates.
/// All tables are tab-separated with a header line; results go to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Rescale exons and introns, shortening long intronic gaps
    Shorten {
        #[clap(flatten)]
        common: CommonOpts,

        /// Exon table (seqnames, start, end, strand, ...)
        #[clap(short = 'e', long, value_parser)]
        exons: PathBuf,

        /// Intron table. Derived from the exons when omitted.
        #[clap(short = 'i', long, value_parser)]
        introns: Option<PathBuf>,

        /// Extra columns splitting the input into independent genes
        #[clap(short = 'p', long = "partition-by", value_parser)]
        partition_by: Vec<String>,

        /// Maximum width an intronic gap is shortened to
        #[clap(short = 'w', long, value_parser, default_value_t = DEFAULT_TARGET_GAP_WIDTH)]
        target_gap_width: i64,

        /// Resize introns that contain gaps with the reference arithmetic, which never shrinks them
        #[clap(long, action)]
        reference_pure_within: bool,
    },
    /// Derive introns from an exon table
    Introns {
        #[clap(flatten)]
        common: CommonOpts,

        /// Exon table (seqnames, start, end, strand, ...)
        #[clap(short = 'e', long, value_parser)]
        exons: PathBuf,
    },
    /// Place CDS rows on rescaled exon coordinates (needs --group)
    Cds {
        #[clap(flatten)]
        common: CommonOpts,

        /// CDS table in original coordinates
        #[clap(short = 'c', long, value_parser)]
        cds: PathBuf,

        /// Exon table in original coordinates
        #[clap(short = 'e', long, value_parser)]
        exons: PathBuf,

        /// Output of the shorten command
        #[clap(short = 'r', long, value_parser)]
        rescaled: PathBuf,

        /// Column naming the transcript of each row
        #[clap(long, value_parser, default_value = "transcript_id")]
        identity_column: String,

        /// Order of transcripts in the output; defaults to order of appearance
        #[clap(long = "factor-order", value_parser)]
        factor_order: Vec<String>,
    },
}

fn init_logger(common: &CommonOpts) {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();
}

fn read_tsv(path: &Path) -> PolarsResult<DataFrame> {
    let parse_options = CsvParseOptions::default().with_separator(b'\t');
    CsvReadOptions::default()
        .with_has_header(true)
        .with_rechunk(true)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

fn write_tsv(df: &mut DataFrame) -> PolarsResult<()> {
    let stdout = io::stdout();
    let mut handle = BufWriter::new(stdout.lock());
    CsvWriter::new(&mut handle)
        .include_header(true)
        .with_separator(b'\t')
        .finish(df)
}

/// Values of `column` in order of first appearance.
fn appearance_order(df: &DataFrame, column: &str) -> PolarsResult<Vec<String>> {
    let values = df.column(column)?.cast(&DataType::String)?;
    let mut order: Vec<String> = Vec::new();
    for value in values.str()?.into_iter().flatten() {
        if !order.iter().any(|v| v == value) {
            order.push(value.to_string());
        }
    }
    Ok(order)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args {
        Args::Shorten {
            common,
            exons,
            introns,
            partition_by,
            target_gap_width,
            reference_pure_within,
        } => {
            init_logger(&common);
            let grouping = Grouping::by(common.group);
            let exons = read_tsv(&exons)?;
            let introns = match introns {
                Some(path) => read_tsv(&path)?,
                None => to_introns_df(&exons, &grouping)?,
            };
            info!("Read {} exons and {} introns", exons.height(), introns.height());

            let options = CompressOptions {
                target_gap_width,
                pure_within: if reference_pure_within {
                    PureWithinRule::Reference
                } else {
                    PureWithinRule::Surplus
                },
            };
            let mut out = shorten_gaps_partitioned_df(&exons, &introns, &grouping, &partition_by, &options)?;
            write_tsv(&mut out)?;
        }
        Args::Introns { common, exons } => {
            init_logger(&common);
            let grouping = Grouping::by(common.group);
            let exons = read_tsv(&exons)?;
            let mut out = to_introns_df(&exons, &grouping)?;
            info!("Derived {} introns", out.height());
            write_tsv(&mut out)?;
        }
        Args::Cds {
            common,
            cds,
            exons,
            rescaled,
            identity_column,
            factor_order,
        } => {
            init_logger(&common);
            let grouping = Grouping::by(common.group);
            let cds = read_tsv(&cds)?;
            let exons = read_tsv(&exons)?;
            let rescaled_exons = read_tsv(&rescaled)?
                .lazy()
                .filter(col("type").eq(lit("exon")))
                .collect()?;

            let factor_order = if factor_order.is_empty() {
                appearance_order(&rescaled_exons, &identity_column)?
            } else {
                factor_order
            };
            let ordering = CdsOrdering {
                identity_column,
                factor_order,
            };

            let diff = cds_exon_diff_df(&exons, &cds, &grouping)?;
            let mut out = rescale_cds_df(&diff, &rescaled_exons, &ordering)?;
            info!("Rescaled {} CDS rows", out.height());
            write_tsv(&mut out)?;
        }
    }

    Ok(())
}
