use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::GeneSeqError;

pub const DEFAULT_ORGANISM: &str = "Homo sapiens";
pub const DEFAULT_ARCHIVE_NAME: &str = "ncbi_genes.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    #[default]
    Nucleotide,
    Protein,
}

impl SequenceKind {
    pub fn from_protein_flag(protein: bool) -> Self {
        if protein {
            SequenceKind::Protein
        } else {
            SequenceKind::Nucleotide
        }
    }

    /// Value of the Datasets `include_annotation_type` parameter.
    pub fn annotation_type(self) -> &'static str {
        match self {
            SequenceKind::Nucleotide => "FASTA_GENE",
            SequenceKind::Protein => "FASTA_PROTEIN",
        }
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceKind::Nucleotide => write!(f, "nucleotide"),
            SequenceKind::Protein => write!(f, "protein"),
        }
    }
}

/// NCBI Gene identifier. Kept as the string the service (or the user) gave us.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneId(String);

impl GeneId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneQuery {
    token: String,
    organism: Option<String>,
    kind: SequenceKind,
}

impl GeneQuery {
    pub fn new(
        token: &str,
        organism: Option<&str>,
        kind: SequenceKind,
    ) -> Result<Self, GeneSeqError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GeneSeqError::InvalidGeneToken(token.to_string()));
        }
        let organism = organism
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self {
            token: token.to_string(),
            organism,
            kind,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn organism(&self) -> Option<&str> {
        self.organism.as_deref()
    }

    pub fn organism_or_default(&self) -> &str {
        self.organism().unwrap_or(DEFAULT_ORGANISM)
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }
}

/// Outcome of resolving the user's token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The token was found as a gene symbol.
    Symbol { symbol: String, gene_id: GeneId },
    /// The search missed; the token is taken as a Gene ID as-is.
    GeneId {
        gene_id: GeneId,
        symbol: Option<String>,
    },
}

impl Resolution {
    pub fn gene_id(&self) -> &GeneId {
        match self {
            Resolution::Symbol { gene_id, .. } | Resolution::GeneId { gene_id, .. } => gene_id,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Resolution::Symbol { symbol, .. } => Some(symbol),
            Resolution::GeneId { symbol, .. } => symbol.as_deref(),
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Resolution::Symbol { .. } => "symbol",
            Resolution::GeneId { .. } => "gene-id",
        }
    }

    pub fn confirmation(&self) -> String {
        match self {
            Resolution::Symbol { symbol, gene_id } => format!("✔ {symbol} → Gene ID {gene_id}"),
            Resolution::GeneId { gene_id, symbol } => format!(
                "✔ {gene_id} → Gene symbol {}",
                symbol.as_deref().unwrap_or("None")
            ),
        }
    }

    /// `<symbol>_<gene id>_data`, or `<gene id>_data` when no symbol is known.
    pub fn extract_dir_name(&self) -> String {
        let gene_id = path_segment(self.gene_id().as_str());
        match self.symbol() {
            Some(symbol) => format!("{}_{gene_id}_data", path_segment(symbol)),
            None => format!("{gene_id}_data"),
        }
    }
}

fn path_segment(value: &str) -> String {
    value.replace(['/', '\\'], "_")
}

/// Destination of the downloaded package; always a `.zip` path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchivePath(Utf8PathBuf);

impl ArchivePath {
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }
}

impl Default for ArchivePath {
    fn default() -> Self {
        Self(Utf8PathBuf::from(DEFAULT_ARCHIVE_NAME))
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArchivePath {
    type Err = GeneSeqError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() || !value.to_lowercase().ends_with(".zip") {
            return Err(GeneSeqError::InvalidOutputName(value.to_string()));
        }
        Ok(Self(Utf8PathBuf::from(value)))
    }
}

impl TryFrom<Utf8PathBuf> for ArchivePath {
    type Error = GeneSeqError;

    fn try_from(value: Utf8PathBuf) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}
