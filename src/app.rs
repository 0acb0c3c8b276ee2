use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::archive::{ExtractionFilter, extract_sequences};
use crate::config::DEFAULT_PACING;
use crate::domain::{ArchivePath, GeneId, GeneQuery, Resolution, SequenceKind};
use crate::error::GeneSeqError;
use crate::ncbi::{DownloadInfo, NcbiClient};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output: ArchivePath,
    pub extract: bool,
    /// Parent of the `<symbol>_<gene id>_data` directory.
    pub extract_root: Utf8PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output: ArchivePath::default(),
            extract: false,
            extract_root: Utf8PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub gene_id: String,
    pub symbol: Option<String>,
    pub resolved_from: String,
    pub sequence_kind: SequenceKind,
    pub archive: String,
    pub archive_bytes: u64,
    pub extract_dir: Option<String>,
    pub extracted: Vec<String>,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<N: NcbiClient> {
    ncbi: N,
    pacing: Duration,
    filter: ExtractionFilter,
}

impl<N: NcbiClient> App<N> {
    pub fn new(ncbi: N) -> Self {
        Self {
            ncbi,
            pacing: DEFAULT_PACING,
            filter: ExtractionFilter::sequences(),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_filter(mut self, filter: ExtractionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Resolves, downloads, waits out the pacing delay and optionally extracts.
    pub fn run(
        &self,
        query: &GeneQuery,
        options: &PipelineOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, GeneSeqError> {
        let archive = options.output.as_path().as_std_path();
        sink.event(ProgressEvent {
            message: "Resolving gene symbols to Gene IDs...".to_string(),
            elapsed: None,
        });

        let (resolution, download) = match self
            .ncbi
            .search_gene_id(query.token(), query.organism_or_default())?
        {
            Some(gene_id) => {
                let resolution = Resolution::Symbol {
                    symbol: query.token().to_string(),
                    gene_id,
                };
                sink.event(ProgressEvent {
                    message: resolution.confirmation(),
                    elapsed: None,
                });
                let download = self.fetch(resolution.gene_id(), query.kind(), options, sink)?;
                (resolution, download)
            }
            None => {
                let gene_id = GeneId::new(query.token());
                let download = self.fetch(&gene_id, query.kind(), options, sink)?;
                let symbol = self.ncbi.gene_symbol(&gene_id)?;
                let resolution = Resolution::GeneId { gene_id, symbol };
                sink.event(ProgressEvent {
                    message: resolution.confirmation(),
                    elapsed: None,
                });
                (resolution, download)
            }
        };
        info!(
            gene_id = resolution.gene_id().as_str(),
            resolved_from = resolution.source(),
            bytes = download.bytes,
            is_zip = download.is_zip,
            "gene package downloaded"
        );

        if !self.pacing.is_zero() {
            thread::sleep(self.pacing);
        }

        let (extract_dir, extracted) = if options.extract {
            let dir = options.extract_root.join(resolution.extract_dir_name());
            let files = extract_sequences(archive, dir.as_std_path(), &self.filter, sink)?;
            info!(dir = %dir, files = files.len(), "sequences extracted");
            (Some(dir.to_string()), files)
        } else {
            (None, Vec::new())
        };

        Ok(RunReport {
            gene_id: resolution.gene_id().to_string(),
            symbol: resolution.symbol().map(str::to_string),
            resolved_from: resolution.source().to_string(),
            sequence_kind: query.kind(),
            archive: options.output.to_string(),
            archive_bytes: download.bytes,
            extract_dir,
            extracted: extracted
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            finished_at: iso_timestamp(),
        })
    }

    fn fetch(
        &self,
        gene_id: &GeneId,
        kind: SequenceKind,
        options: &PipelineOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadInfo, GeneSeqError> {
        let start = Instant::now();
        let destination = options.output.as_path().as_std_path();
        let download = self
            .ncbi
            .download_gene_package(gene_id, kind, destination)?;
        sink.event(ProgressEvent {
            message: format!("Downloaded: {}", options.output),
            elapsed: Some(start.elapsed()),
        });
        Ok(download)
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
