use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use kira_gene_seq::app::{App, PipelineOptions, ProgressEvent, ProgressSink};
use kira_gene_seq::domain::{GeneId, GeneQuery, SequenceKind};
use kira_gene_seq::error::GeneSeqError;
use kira_gene_seq::ncbi::{DownloadInfo, NcbiClient};

struct RecordingNcbi {
    search: Option<&'static str>,
    symbol: Option<&'static str>,
    package: Vec<u8>,
    fail_download: bool,
    calls: Mutex<Vec<String>>,
}

impl RecordingNcbi {
    fn new(search: Option<&'static str>, symbol: Option<&'static str>) -> Self {
        Self {
            search,
            symbol,
            package: zip_bytes(&[("ncbi_dataset/data/gene.fna", ">g\nACGT\n")]),
            fail_download: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_package(mut self, package: Vec<u8>) -> Self {
        self.package = package;
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl NcbiClient for RecordingNcbi {
    fn search_gene_id(
        &self,
        symbol: &str,
        organism: &str,
    ) -> Result<Option<GeneId>, GeneSeqError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("search {symbol} [{organism}]"));
        Ok(self.search.map(GeneId::new))
    }

    fn gene_symbol(&self, gene_id: &GeneId) -> Result<Option<String>, GeneSeqError> {
        self.calls.lock().unwrap().push(format!("summary {gene_id}"));
        Ok(self.symbol.map(str::to_string))
    }

    fn download_gene_package(
        &self,
        gene_id: &GeneId,
        kind: SequenceKind,
        destination: &Path,
    ) -> Result<DownloadInfo, GeneSeqError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("download {gene_id} {}", kind.annotation_type()));
        if self.fail_download {
            return Err(GeneSeqError::NcbiStatus {
                status: 404,
                message: "gene not found".to_string(),
            });
        }
        fs::write(destination, &self.package).unwrap();
        Ok(DownloadInfo {
            bytes: self.package.len() as u64,
            is_zip: true,
        })
    }
}

#[derive(Default)]
struct CaptureSink {
    messages: RefCell<Vec<String>>,
}

impl ProgressSink for CaptureSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.borrow_mut().push(event.message);
    }
}

impl CaptureSink {
    fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(needle))
    }
}

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
            continue;
        }
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn options_in(dir: &Path, extract: bool) -> PipelineOptions {
    let root = Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap();
    PipelineOptions {
        output: root.join("genes.zip").try_into().unwrap(),
        extract,
        extract_root: root,
    }
}

fn quiet_app(ncbi: RecordingNcbi) -> App<RecordingNcbi> {
    App::new(ncbi).with_pacing(Duration::ZERO)
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn resolved_symbol_downloads_by_gene_id() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("BRCA1", None, SequenceKind::Nucleotide).unwrap();
    let sink = CaptureSink::default();
    let app = quiet_app(RecordingNcbi::new(Some("672"), None));

    let report = app
        .run(&query, &options_in(temp.path(), false), &sink)
        .unwrap();

    assert_eq!(report.gene_id, "672");
    assert_eq!(report.symbol.as_deref(), Some("BRCA1"));
    assert_eq!(report.resolved_from, "symbol");
    assert!(sink.contains("BRCA1 → Gene ID 672"));
    assert!(temp.path().join("genes.zip").exists());
}

#[test]
fn resolved_symbol_never_calls_summary() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("BRCA1", None, SequenceKind::Nucleotide).unwrap();
    let ncbi = RecordingNcbi::new(Some("672"), Some("unused"));

    App::new(&ncbi)
        .with_pacing(Duration::ZERO)
        .run(&query, &options_in(temp.path(), false), &CaptureSink::default())
        .unwrap();

    assert_eq!(
        ncbi.calls(),
        vec![
            "search BRCA1 [Homo sapiens]".to_string(),
            "download 672 FASTA_GENE".to_string(),
        ]
    );
}

#[test]
fn unresolved_token_is_used_as_gene_id() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("99999999", None, SequenceKind::Nucleotide).unwrap();
    let ncbi = RecordingNcbi::new(None, None);
    let sink = CaptureSink::default();

    let report = App::new(&ncbi)
        .with_pacing(Duration::ZERO)
        .run(&query, &options_in(temp.path(), false), &sink)
        .unwrap();

    assert_eq!(
        ncbi.calls(),
        vec![
            "search 99999999 [Homo sapiens]".to_string(),
            "download 99999999 FASTA_GENE".to_string(),
            "summary 99999999".to_string(),
        ]
    );
    assert_eq!(report.gene_id, "99999999");
    assert_eq!(report.symbol, None);
    assert_eq!(report.resolved_from, "gene-id");
    assert!(sink.contains("99999999 → Gene symbol None"));
}

#[test]
fn organism_and_protein_are_forwarded() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("Trp53", Some("Mus musculus"), SequenceKind::Protein).unwrap();
    let ncbi = RecordingNcbi::new(Some("22059"), None);

    App::new(&ncbi)
        .with_pacing(Duration::ZERO)
        .run(&query, &options_in(temp.path(), false), &CaptureSink::default())
        .unwrap();

    assert_eq!(
        ncbi.calls(),
        vec![
            "search Trp53 [Mus musculus]".to_string(),
            "download 22059 FASTA_PROTEIN".to_string(),
        ]
    );
}

#[test]
fn extract_keeps_only_sequence_files_flattened() {
    let temp = tempfile::tempdir().unwrap();
    let package = zip_bytes(&[
        ("a.fna", ">a\nACGT\n"),
        ("notes.txt", "not a sequence"),
        ("b/", ""),
        ("b/b.faa", ">b\nMKV\n"),
    ]);
    let query = GeneQuery::new("BRCA1", None, SequenceKind::Nucleotide).unwrap();
    let sink = CaptureSink::default();
    let app = quiet_app(RecordingNcbi::new(Some("672"), None).with_package(package));

    let report = app.run(&query, &options_in(temp.path(), true), &sink).unwrap();

    let dir = temp.path().join("BRCA1_672_data");
    assert_eq!(file_names(&dir), vec!["a.fna", "b.faa"]);
    assert_eq!(fs::read(dir.join("b.faa")).unwrap(), b">b\nMKV\n");
    assert_eq!(report.extracted.len(), 2);
    assert!(sink.contains("Extracted b.faa to"));
}

#[test]
fn extract_dir_uses_symbol_from_summary() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("7157", None, SequenceKind::Nucleotide).unwrap();
    let app = quiet_app(RecordingNcbi::new(None, Some("TP53")));

    let report = app
        .run(&query, &options_in(temp.path(), true), &CaptureSink::default())
        .unwrap();

    assert!(temp.path().join("TP53_7157_data/gene.fna").exists());
    assert_eq!(report.symbol.as_deref(), Some("TP53"));
}

#[test]
fn extract_dir_omits_missing_symbol() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("99999999", None, SequenceKind::Nucleotide).unwrap();
    let app = quiet_app(RecordingNcbi::new(None, None));

    app.run(&query, &options_in(temp.path(), true), &CaptureSink::default())
        .unwrap();

    assert!(temp.path().join("99999999_data/gene.fna").exists());
    assert!(!temp.path().join("None_99999999_data").exists());
}

#[test]
fn download_failure_aborts_before_summary_and_extraction() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("NOPE1", None, SequenceKind::Nucleotide).unwrap();
    let mut ncbi = RecordingNcbi::new(None, Some("NOPE1"));
    ncbi.fail_download = true;

    let err = App::new(&ncbi)
        .with_pacing(Duration::ZERO)
        .run(&query, &options_in(temp.path(), true), &CaptureSink::default())
        .unwrap_err();

    assert_matches!(err, GeneSeqError::NcbiStatus { status: 404, .. });
    assert_eq!(
        ncbi.calls(),
        vec![
            "search NOPE1 [Homo sapiens]".to_string(),
            "download NOPE1 FASTA_GENE".to_string(),
        ]
    );
    assert_eq!(file_names(temp.path()), Vec::<String>::new());
}

#[test]
fn corrupt_package_fails_extraction_but_keeps_archive() {
    let temp = tempfile::tempdir().unwrap();
    let query = GeneQuery::new("BRCA1", None, SequenceKind::Nucleotide).unwrap();
    let ncbi = RecordingNcbi::new(Some("672"), None).with_package(b"{\"error\":1}".to_vec());
    let app = quiet_app(ncbi);

    let err = app
        .run(&query, &options_in(temp.path(), true), &CaptureSink::default())
        .unwrap_err();

    assert_matches!(err, GeneSeqError::Archive(_));
    assert!(temp.path().join("genes.zip").exists());
}
