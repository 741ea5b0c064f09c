//! Dataset loading and the typed record shapes for each group.
//!
//! The dataset is a single JSON document with up to four named groups, each a
//! mapping of document key to record. Every record type names the fields the
//! pipeline actually reads and keeps everything else in a flattened
//! catch-all, so unrecognized fields survive the trip into the store
//! unchanged.
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::document::{document_from_json, Document};

/// Static description of a record group: the group key in the dataset file
/// (which doubles as the destination collection) and the field names the
/// temporal normalizer recognizes for it.
#[derive(Debug)]
pub struct GroupSpec {
    pub name: &'static str,
    pub temporal_fields: &'static [&'static str],
}

pub static MATERIAIS: GroupSpec = GroupSpec {
    name: "materiais",
    temporal_fields: &["criadoEm", "atualizadoEm"],
};

pub static INSTRUMENTOS: GroupSpec = GroupSpec {
    name: "instrumentos",
    temporal_fields: &[
        "criadoEm",
        "atualizadoEm",
        "dataEmprestimo",
        "dataDevolucaoPrevista",
    ],
};

pub static ALERTAS: GroupSpec = GroupSpec {
    name: "alertas",
    temporal_fields: &["criadoEm"],
};

pub static USUARIOS: GroupSpec = GroupSpec {
    name: "usuarios",
    temporal_fields: &["criadoEm", "atualizadoEm"],
};

pub trait GroupRecord: Serialize {
    fn spec() -> &'static GroupSpec;

    /// Human label for narration (`nome` or `titulo`), when present.
    fn label(&self) -> Option<&str>;

    /// Full record as a store document: named fields plus the catch-all.
    fn to_document(&self) -> Result<Document> {
        let json = serde_json::to_value(self)?;
        let JsonValue::Object(map) = json else {
            bail!("record did not serialize to an object");
        };
        Ok(document_from_json(&map))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl GroupRecord for MaterialRecord {
    fn spec() -> &'static GroupSpec {
        &MATERIAIS
    }
    fn label(&self) -> Option<&str> {
        self.nome.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl GroupRecord for InstrumentRecord {
    fn spec() -> &'static GroupSpec {
        &INSTRUMENTOS
    }
    fn label(&self) -> Option<&str> {
        self.nome.as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl GroupRecord for AlertRecord {
    fn spec() -> &'static GroupSpec {
        &ALERTAS
    }
    fn label(&self) -> Option<&str> {
        self.titulo.as_deref()
    }
}

/// Identity record. The named fields are the ones the reconciliation phase
/// reads; credentials and anything else authored into the dataset land in
/// `extra` and never reach the migration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ativo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localizacao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

impl GroupRecord for UserRecord {
    fn spec() -> &'static GroupSpec {
        &USUARIOS
    }
    fn label(&self) -> Option<&str> {
        self.nome.as_deref()
    }
}

/// The loaded dataset. Groups keep file order for their records; unknown
/// top-level groups are ignored, missing groups deserialize empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub materiais: IndexMap<String, MaterialRecord>,
    #[serde(default)]
    pub instrumentos: IndexMap<String, InstrumentRecord>,
    #[serde(default)]
    pub alertas: IndexMap<String, AlertRecord>,
    #[serde(default)]
    pub usuarios: IndexMap<String, UserRecord>,
}

impl Dataset {
    pub fn total_records(&self) -> usize {
        self.materiais.len() + self.instrumentos.len() + self.alertas.len() + self.usuarios.len()
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading dataset {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&raw)
        .with_context(|| format!("parsing dataset {}", path.display()))?;
    Ok(dataset)
}
