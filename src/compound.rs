//! Reference compound metadata
//!
//! Figures carry a short identity card for the substance: IUPAC name, CAS
//! number, formula, masses, synonyms and SMILES. Records come from PubChem
//! PUG-REST JSON responses saved under a directory as `<cid>.json`, holding a
//! `PropertyTable` (property query), an `InformationList` (synonym query), or
//! both merged into one object.
//!
//! Every field is optional and prints as `N/A` when missing; a failed lookup
//! never stops a figure from being drawn.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder printed for missing metadata
pub const NOT_AVAILABLE: &str = "N/A";

/// Synonyms shown on a figure
pub const SYNONYMS_SHOWN: usize = 3;

/// Errors raised while looking up a compound
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Record file could not be read
    #[error("Cannot read compound record {path}: {source}")]
    Io {
        /// Record path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record is not valid PUG-REST JSON
    #[error("Malformed compound record for CID {cid}: {source}")]
    Json {
        /// Compound id
        cid: u64,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// No record exists for the id
    #[error("No compound record for CID {0}")]
    NotFound(u64),
}

/// Identity card for one reference compound
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompoundInfo {
    /// PubChem compound id
    pub cid: Option<u64>,
    /// IUPAC name
    pub iupac_name: Option<String>,
    /// First synonym, PubChem's preferred name
    pub substance_name: Option<String>,
    /// First synonym shaped like a CAS registry number
    pub cas: Option<String>,
    /// Monoisotopic mass
    pub exact_mass: Option<String>,
    /// Molecular formula
    pub formula: Option<String>,
    /// Molecular weight
    pub molecular_weight: Option<String>,
    /// Leading synonyms
    pub synonyms: Vec<String>,
    /// Isomeric SMILES, falling back to canonical
    pub smiles: Option<String>,
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

impl CompoundInfo {
    /// IUPAC name or `N/A`
    pub fn iupac_name(&self) -> &str {
        or_na(&self.iupac_name)
    }

    /// Substance name or `N/A`
    pub fn substance_name(&self) -> &str {
        or_na(&self.substance_name)
    }

    /// CAS number or `N/A`
    pub fn cas(&self) -> &str {
        or_na(&self.cas)
    }

    /// Exact mass or `N/A`
    pub fn exact_mass(&self) -> &str {
        or_na(&self.exact_mass)
    }

    /// Formula or `N/A`
    pub fn formula(&self) -> &str {
        or_na(&self.formula)
    }

    /// Molecular weight or `N/A`
    pub fn molecular_weight(&self) -> &str {
        or_na(&self.molecular_weight)
    }

    /// SMILES or `N/A`
    pub fn smiles(&self) -> &str {
        or_na(&self.smiles)
    }

    /// Leading synonyms joined with `, `, or `N/A`
    pub fn synonyms_text(&self) -> String {
        if self.synonyms.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.synonyms.join(", ")
        }
    }

    /// Build a card from a full synonym list, deriving name, CAS and the
    /// shown synonyms from it
    pub fn with_synonyms(mut self, all: &[String]) -> Self {
        self.substance_name = all.first().cloned();
        self.cas = all.iter().find(|s| looks_like_cas(s)).cloned();
        self.synonyms = all.iter().take(SYNONYMS_SHOWN).cloned().collect();
        self
    }
}

impl fmt::Display for CompoundInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Substance: {}", self.substance_name())?;
        writeln!(f, "IUPAC: {}", self.iupac_name())?;
        writeln!(f, "CAS: {}", self.cas())?;
        writeln!(f, "Mass: {}", self.exact_mass())?;
        writeln!(f, "Weight: {}", self.molecular_weight())?;
        writeln!(f, "Formula: {}", self.formula())?;
        writeln!(f, "Synonyms: {}", self.synonyms_text())?;
        write!(f, "Structure: {}", self.smiles())
    }
}

/// Whether a synonym looks like a CAS registry number: it has a hyphen and
/// only digits once hyphens are removed (`50-78-2`)
pub fn looks_like_cas(synonym: &str) -> bool {
    synonym.contains('-') && {
        let digits: String = synonym.chars().filter(|&c| c != '-').collect();
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    }
}

/// Source of reference compound metadata
pub trait CompoundLookup {
    /// Fetch the card for `cid`
    fn lookup(&self, cid: u64) -> Result<CompoundInfo, LookupError>;
}

/// Lookup that knows nothing; every card is all `N/A`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl CompoundLookup for NoLookup {
    fn lookup(&self, cid: u64) -> Result<CompoundInfo, LookupError> {
        Ok(CompoundInfo {
            cid: Some(cid),
            ..Default::default()
        })
    }
}

/// Fetch a card, falling back to all `N/A` on any failure
pub fn describe(lookup: &dyn CompoundLookup, cid: Option<u64>) -> CompoundInfo {
    let Some(cid) = cid else {
        return CompoundInfo::default();
    };
    match lookup.lookup(cid) {
        Ok(info) => info,
        Err(e) => {
            warn!("Compound lookup failed: {}", e);
            CompoundInfo {
                cid: Some(cid),
                ..Default::default()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PugRestRecord {
    #[serde(rename = "PropertyTable")]
    property_table: Option<PropertyTable>,
    #[serde(rename = "InformationList")]
    information_list: Option<InformationList>,
}

#[derive(Debug, Deserialize)]
struct PropertyTable {
    #[serde(rename = "Properties", default)]
    properties: Vec<Properties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Properties {
    #[serde(rename = "IUPACName")]
    iupac_name: Option<String>,
    molecular_formula: Option<String>,
    molecular_weight: Option<Value>,
    exact_mass: Option<Value>,
    #[serde(rename = "IsomericSMILES")]
    isomeric_smiles: Option<String>,
    #[serde(rename = "SMILES")]
    smiles: Option<String>,
    #[serde(rename = "CanonicalSMILES")]
    canonical_smiles: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InformationList {
    #[serde(rename = "Information", default)]
    information: Vec<Information>,
}

#[derive(Debug, Deserialize)]
struct Information {
    #[serde(rename = "Synonym", default)]
    synonym: Vec<String>,
}

/// PUG-REST returns masses as strings in current responses, numbers in older ones
fn value_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parse a saved PUG-REST response into a card
pub fn parse_pug_rest(cid: u64, json: &str) -> Result<CompoundInfo, LookupError> {
    let record: PugRestRecord =
        serde_json::from_str(json).map_err(|source| LookupError::Json { cid, source })?;

    let props = record
        .property_table
        .and_then(|t| t.properties.into_iter().next())
        .unwrap_or_default();
    let synonyms = record
        .information_list
        .and_then(|l| l.information.into_iter().next())
        .map(|i| i.synonym)
        .unwrap_or_default();

    let info = CompoundInfo {
        cid: Some(cid),
        iupac_name: non_empty(props.iupac_name),
        formula: non_empty(props.molecular_formula),
        molecular_weight: value_text(props.molecular_weight),
        exact_mass: value_text(props.exact_mass),
        smiles: non_empty(props.isomeric_smiles)
            .or_else(|| non_empty(props.smiles))
            .or_else(|| non_empty(props.canonical_smiles)),
        ..Default::default()
    };
    Ok(info.with_synonyms(&synonyms))
}

/// Directory of saved PUG-REST responses, one `<cid>.json` per compound
#[derive(Debug, Clone)]
pub struct PubChemDirectory {
    root: PathBuf,
}

impl PubChemDirectory {
    /// Use records under `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of the record for `cid`
    pub fn record_path(&self, cid: u64) -> PathBuf {
        self.root.join(format!("{cid}.json"))
    }
}

impl CompoundLookup for PubChemDirectory {
    fn lookup(&self, cid: u64) -> Result<CompoundInfo, LookupError> {
        let path = self.record_path(cid);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LookupError::NotFound(cid))
            }
            Err(source) => return Err(LookupError::Io { path, source }),
        };
        parse_pug_rest(cid, &json)
    }
}
