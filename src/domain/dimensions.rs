//! Partitioning dimensions as the upstream site exposes them.
//!
//! Dimension values are opaque `{id, name}` pairs fetched once per run and
//! never persisted; identifiers come straight from the site's selection
//! popups and form options.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One selectable value of a partitioning dimension (a university, an
/// institute, a subject, or a thesis type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionValue {
    pub id: String,
    pub name: String,
}

impl DimensionValue {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The refinement dimensions available for splitting an over-sized
/// partition, in the order the configuration lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefinementKind {
    ThesisType,
    Institute,
    Subject,
}

impl RefinementKind {
    /// Short site-derived tag used inside encoded ledger keys.
    pub fn tag(self) -> &'static str {
        match self {
            Self::ThesisType => "tur",
            Self::Institute => "ens",
            Self::Subject => "konu",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "tur" => Some(Self::ThesisType),
            "ens" => Some(Self::Institute),
            "konu" => Some(Self::Subject),
            _ => None,
        }
    }

    /// Human-readable label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::ThesisType => "thesis type",
            Self::Institute => "institute",
            Self::Subject => "subject",
        }
    }
}

/// Everything the site offers for partitioning, fetched once per run.
#[derive(Debug, Clone, Default)]
pub struct Dimensions {
    pub universities: Vec<DimensionValue>,
    pub institutes: Vec<DimensionValue>,
    pub subjects: Vec<DimensionValue>,
    pub thesis_types: Vec<DimensionValue>,
    /// Newest first.
    pub years: Vec<String>,
}

impl Dimensions {
    /// The values backing one refinement dimension.
    pub fn values_for(&self, kind: RefinementKind) -> &[DimensionValue] {
        match kind {
            RefinementKind::ThesisType => &self.thesis_types,
            RefinementKind::Institute => &self.institutes,
            RefinementKind::Subject => &self.subjects,
        }
    }
}

/// Enumerates the partitioning dimensions. Pure read, no state; re-queried
/// on every orchestrator restart.
#[async_trait]
pub trait DimensionSource: Send + Sync {
    async fn fetch_dimensions(&self) -> Result<Dimensions>;
}
