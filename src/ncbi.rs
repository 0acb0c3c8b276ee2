use std::fs::File;
use std::path::Path;
use std::time::Instant;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{Credentials, HTTP_TIMEOUT, NcbiEndpoints};
use crate::domain::{GeneId, SequenceKind};
use crate::error::GeneSeqError;

#[derive(Debug, Clone, Copy)]
pub struct DownloadInfo {
    pub bytes: u64,
    pub is_zip: bool,
}

/// Lookups and downloads against NCBI Gene.
pub trait NcbiClient: Send + Sync {
    /// First Gene ID whose name matches `symbol` in `organism`.
    fn search_gene_id(&self, symbol: &str, organism: &str)
    -> Result<Option<GeneId>, GeneSeqError>;

    /// Display name of the gene record, if the summary has one.
    fn gene_symbol(&self, gene_id: &GeneId) -> Result<Option<String>, GeneSeqError>;

    /// Writes the Datasets gene package for `gene_id` to `destination`.
    fn download_gene_package(
        &self,
        gene_id: &GeneId,
        kind: SequenceKind,
        destination: &Path,
    ) -> Result<DownloadInfo, GeneSeqError>;
}

impl<T: NcbiClient + ?Sized> NcbiClient for &T {
    fn search_gene_id(
        &self,
        symbol: &str,
        organism: &str,
    ) -> Result<Option<GeneId>, GeneSeqError> {
        (**self).search_gene_id(symbol, organism)
    }

    fn gene_symbol(&self, gene_id: &GeneId) -> Result<Option<String>, GeneSeqError> {
        (**self).gene_symbol(gene_id)
    }

    fn download_gene_package(
        &self,
        gene_id: &GeneId,
        kind: SequenceKind,
        destination: &Path,
    ) -> Result<DownloadInfo, GeneSeqError> {
        (**self).download_gene_package(gene_id, kind, destination)
    }
}

#[derive(Clone)]
pub struct NcbiHttpClient {
    client: Client,
    credentials: Credentials,
    endpoints: NcbiEndpoints,
}

impl NcbiHttpClient {
    pub fn new(credentials: Credentials) -> Result<Self, GeneSeqError> {
        Self::with_endpoints(credentials, NcbiEndpoints::default())
    }

    pub fn with_endpoints(
        credentials: Credentials,
        endpoints: NcbiEndpoints,
    ) -> Result<Self, GeneSeqError> {
        let version = env!("CARGO_PKG_VERSION");
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&format!("get-gene-seq/{version}"))?);
        headers.insert("X-Datasets-Client", HeaderValue::from_static("get-gene-seq"));
        headers.insert("X-Datasets-Client-Version", header_value(version)?);
        headers.insert("X-Datasets-Client-OS", header_value(std::env::consts::OS)?);
        headers.insert(
            "X-Datasets-Client-Arch",
            header_value(std::env::consts::ARCH)?,
        );
        let mut api_key = header_value(&credentials.api_key)?;
        api_key.set_sensitive(true);
        headers.insert("api-key", api_key);

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT);
        if endpoints.is_loopback() {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|err| GeneSeqError::NcbiHttp(err.to_string()))?;

        Ok(Self {
            client,
            credentials,
            endpoints,
        })
    }

    fn esearch_url(&self) -> String {
        format!("{}/esearch.fcgi", self.endpoints.eutils_base)
    }

    fn esummary_url(&self) -> String {
        format!("{}/esummary.fcgi", self.endpoints.eutils_base)
    }

    fn download_url(&self, gene_id: &GeneId) -> String {
        format!(
            "{}/gene/id/{}/download",
            self.endpoints.datasets_base,
            gene_id.as_str()
        )
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response, GeneSeqError> {
        let start = Instant::now();
        let response = request
            .send()
            .map_err(|err| GeneSeqError::NcbiHttp(err.to_string()))?;
        debug!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "ncbi.response"
        );
        Self::handle_status(response)
    }

    fn handle_status(response: Response) -> Result<Response, GeneSeqError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "NCBI request failed".to_string());
        Err(GeneSeqError::NcbiStatus { status, message })
    }
}

impl NcbiClient for NcbiHttpClient {
    fn search_gene_id(
        &self,
        symbol: &str,
        organism: &str,
    ) -> Result<Option<GeneId>, GeneSeqError> {
        let term = search_term(symbol, organism);
        debug!(%term, "ncbi.esearch");
        let request = self.client.get(self.esearch_url()).query(&[
            ("db", "gene"),
            ("term", term.as_str()),
            ("retmode", "json"),
            ("email", self.credentials.email.as_str()),
            ("api_key", self.credentials.api_key.as_str()),
        ]);
        let body = self
            .send(request)?
            .text()
            .map_err(|err| GeneSeqError::NcbiHttp(err.to_string()))?;
        parse_esearch_first_id(&body)
    }

    fn gene_symbol(&self, gene_id: &GeneId) -> Result<Option<String>, GeneSeqError> {
        debug!(gene_id = gene_id.as_str(), "ncbi.esummary");
        let request = self.client.get(self.esummary_url()).query(&[
            ("db", "gene"),
            ("id", gene_id.as_str()),
            ("retmode", "json"),
            ("api_key", self.credentials.api_key.as_str()),
        ]);
        let payload: Value = self
            .send(request)?
            .json()
            .map_err(|err| GeneSeqError::NcbiPayload(err.to_string()))?;
        Ok(parse_esummary_name(&payload, gene_id))
    }

    fn download_gene_package(
        &self,
        gene_id: &GeneId,
        kind: SequenceKind,
        destination: &Path,
    ) -> Result<DownloadInfo, GeneSeqError> {
        let url = self.download_url(gene_id);
        debug!(%url, annotation = kind.annotation_type(), "ncbi.download");
        let request = self
            .client
            .get(&url)
            .query(&[("include_annotation_type", kind.annotation_type())]);
        let response = self.send(request)?;
        write_response_to_file(response, destination)
    }
}

fn write_response_to_file(
    mut response: Response,
    destination: &Path,
) -> Result<DownloadInfo, GeneSeqError> {
    let is_zip = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("zip"))
        .unwrap_or(false);

    let mut file = File::create(destination).map_err(|err| {
        GeneSeqError::Filesystem(format!("create {}: {err}", destination.display()))
    })?;
    let bytes = std::io::copy(&mut response, &mut file)
        .map_err(|err| GeneSeqError::Filesystem(err.to_string()))?;
    Ok(DownloadInfo { bytes, is_zip })
}

fn header_value(value: &str) -> Result<HeaderValue, GeneSeqError> {
    HeaderValue::from_str(value).map_err(|err| GeneSeqError::NcbiHttp(err.to_string()))
}

pub fn search_term(symbol: &str, organism: &str) -> String {
    format!("{symbol}[Gene Name] AND {organism}[Organism]")
}

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    #[serde(default)]
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// First id of an ESearch JSON body; `None` when nothing matched.
pub fn parse_esearch_first_id(body: &str) -> Result<Option<GeneId>, GeneSeqError> {
    let envelope: ESearchEnvelope =
        serde_json::from_str(body).map_err(|err| GeneSeqError::NcbiPayload(err.to_string()))?;
    Ok(envelope
        .esearchresult
        .and_then(|result| result.idlist.into_iter().next())
        .map(GeneId::new))
}

pub fn parse_esummary_name(payload: &Value, gene_id: &GeneId) -> Option<String> {
    payload["result"][gene_id.as_str()]["name"]
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
