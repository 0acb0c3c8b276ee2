use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_gene_seq::app::{App, PipelineOptions};
use kira_gene_seq::config::Credentials;
use kira_gene_seq::domain::{ArchivePath, GeneQuery, SequenceKind};
use kira_gene_seq::error::GeneSeqError;
use kira_gene_seq::ncbi::NcbiHttpClient;
use kira_gene_seq::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "get-gene-seq")]
#[command(about = "Download NCBI gene sequences for a gene symbol or Gene ID")]
#[command(version, author)]
struct Cli {
    /// Gene symbol (e.g. BRCA1) or NCBI Gene ID
    #[arg(long)]
    genes: String,

    /// Organism used when searching by symbol [default: Homo sapiens]
    #[arg(long)]
    organism: Option<String>,

    /// Download protein sequences instead of nucleotide
    #[arg(long)]
    protein: bool,

    /// Output ZIP filename (must end in '.zip')
    #[arg(short, long, default_value = "ncbi_genes.zip")]
    output: ArchivePath,

    /// Extract sequence files from the downloaded ZIP
    #[arg(long)]
    extract: bool,

    /// Print a JSON summary instead of progress lines
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GeneSeqError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GeneSeqError) -> u8 {
    if error.is_configuration() {
        2
    } else if error.is_remote() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let credentials = Credentials::from_env()?;
    let query = GeneQuery::new(
        &cli.genes,
        cli.organism.as_deref(),
        SequenceKind::from_protein_flag(cli.protein),
    )?;
    let options = PipelineOptions {
        output: cli.output,
        extract: cli.extract,
        extract_root: Utf8PathBuf::from("."),
    };

    let app = App::new(NcbiHttpClient::new(credentials)?);
    match output_mode {
        OutputMode::NonInteractive => {
            let report = app.run(&query, &options, &JsonOutput)?;
            JsonOutput::print_run(&report).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            app.run(&query, &options, &ConsoleOutput)?;
        }
    }
    Ok(())
}
