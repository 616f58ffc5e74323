//! In-memory representation of protein and peptide identifications
//!
//! The layout follows the usual identification containers: a
//! [`ProteinIdentification`] describes one search run and the proteins it
//! reported, each [`PeptideIdentification`] holds the ranked candidate hits
//! for a single spectrum and points back to its run through `identifier`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Well-known meta value keys written by the crosslink search
pub mod meta {
    /// Non-zero when the hit carries a nucleotide adduct
    pub const IS_XL: &str = "NuXL:isXL";
    /// Adduct label, e.g. `U-H2O`
    pub const NA: &str = "NuXL:NA";
    /// Adduct mass (uncharged)
    pub const NA_MASS: &str = "NuXL:NA_MASS_z0";
    /// 0-based position of the crosslinked residue within the peptide, -1 if unknown
    pub const BEST_LOCALIZATION_POSITION: &str = "NuXL:best_localization_position";
    pub const TARGET_DECOY: &str = "target_decoy";
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDecoy {
    #[serde(rename = "target")]
    Target,
    #[serde(rename = "decoy")]
    Decoy,
    /// Sequence shared between a target and a decoy entry
    #[serde(rename = "target+decoy")]
    TargetDecoy,
}

impl TargetDecoy {
    pub fn is_decoy(self) -> bool {
        self == TargetDecoy::Decoy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetDecoy::Target => "target",
            TargetDecoy::Decoy => "decoy",
            TargetDecoy::TargetDecoy => "target+decoy",
        }
    }
}

impl Display for TargetDecoy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Double(f64),
    String(String),
    StringList(Vec<String>),
}

impl MetaValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            MetaValue::Double(d) => Some(*d as i64),
            MetaValue::String(s) => s.trim().parse().ok(),
            MetaValue::StringList(_) => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Double(d) => Some(*d),
            MetaValue::String(s) => s.trim().parse().ok(),
            MetaValue::StringList(_) => None,
        }
    }

    /// Type tag used by identification formats
    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::Int(_) => "int",
            MetaValue::Double(_) => "float",
            MetaValue::String(_) => "string",
            MetaValue::StringList(_) => "stringList",
        }
    }
}

impl Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Double(d) => write!(f, "{}", d),
            MetaValue::String(s) => f.write_str(s),
            MetaValue::StringList(l) => write!(f, "[{}]", l.join(",")),
        }
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Double(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.into())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

pub type MetaInfo = BTreeMap<String, MetaValue>;

/// Location of a peptide within a protein sequence
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeptideEvidence {
    pub accession: String,
    /// 0-based position of the first residue of the peptide
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

impl PeptideEvidence {
    pub fn new<S: Into<String>>(accession: S, start: Option<usize>) -> Self {
        Self {
            accession: accession.into(),
            start,
            end: None,
        }
    }
}

/// Candidate peptide match for a spectrum
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeptideHit {
    pub score: f64,
    #[serde(default = "default_rank")]
    pub rank: usize,
    pub sequence: String,
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub target_decoy: Option<TargetDecoy>,
    #[serde(default)]
    pub evidences: Vec<PeptideEvidence>,
    #[serde(default)]
    pub meta: MetaInfo,
}

fn default_rank() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl PeptideHit {
    pub fn new<S: Into<String>>(sequence: S, score: f64, rank: usize) -> Self {
        Self {
            score,
            rank,
            sequence: sequence.into(),
            charge: 0,
            target_decoy: None,
            evidences: Vec::new(),
            meta: MetaInfo::new(),
        }
    }

    /// Does this hit carry a crosslinked adduct? Hits without the flag are
    /// plain peptides.
    pub fn is_crosslink(&self) -> bool {
        self.meta
            .get(meta::IS_XL)
            .and_then(MetaValue::as_int)
            .map(|flag| flag != 0)
            .unwrap_or(false)
    }

    pub fn is_decoy(&self) -> bool {
        self.target_decoy.map(TargetDecoy::is_decoy).unwrap_or(false)
    }

    pub fn accessions(&self) -> impl Iterator<Item = &str> {
        self.evidences.iter().map(|ev| ev.accession.as_str())
    }

    pub fn meta_int(&self, key: &str) -> Option<i64> {
        self.meta.get(key).and_then(MetaValue::as_int)
    }

    pub fn meta_double(&self, key: &str) -> Option<f64> {
        self.meta.get(key).and_then(MetaValue::as_double)
    }

    pub fn meta_string(&self, key: &str) -> Option<String> {
        self.meta.get(key).map(|v| v.to_string())
    }

    pub fn set_meta<K: Into<String>, V: Into<MetaValue>>(&mut self, key: K, value: V) {
        self.meta.insert(key.into(), value.into());
    }
}

/// All candidate hits for a single spectrum, best first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeptideIdentification {
    /// Identifier of the [`ProteinIdentification`] run this spectrum was searched in
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub rt: f64,
    #[serde(default)]
    pub mz: f64,
    #[serde(default)]
    pub spectrum_reference: String,
    #[serde(default)]
    pub score_type: String,
    #[serde(default = "default_true")]
    pub higher_score_better: bool,
    pub hits: Vec<PeptideHit>,
    #[serde(default)]
    pub meta: MetaInfo,
}

impl PeptideIdentification {
    /// Copy everything but the hits, which are replaced by `hits`
    pub fn with_hits(&self, hits: Vec<PeptideHit>) -> Self {
        Self {
            identifier: self.identifier.clone(),
            rt: self.rt,
            mz: self.mz,
            spectrum_reference: self.spectrum_reference.clone(),
            score_type: self.score_type.clone(),
            higher_score_better: self.higher_score_better,
            hits,
            meta: self.meta.clone(),
        }
    }

    /// Is score `a` at least as good as `b` under this identification's
    /// score orientation?
    pub fn at_least_as_good(&self, a: f64, b: f64) -> bool {
        match self.higher_score_better {
            true => a >= b,
            false => a <= b,
        }
    }

    /// Is score `a` strictly better than `b`?
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        match self.higher_score_better {
            true => a > b,
            false => a < b,
        }
    }
}

/// Crosslink site annotated on a protein
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProteinModification {
    pub residue: Option<char>,
    pub name: String,
    pub mass: f64,
    /// Peptide sequence of the hit the annotation was derived from
    pub peptide: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProteinHit {
    pub accession: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub target_decoy: Option<TargetDecoy>,
    #[serde(default)]
    pub meta: MetaInfo,
    /// 0-based protein position -> site annotation
    #[serde(default)]
    pub modifications: BTreeMap<usize, ProteinModification>,
}

impl ProteinHit {
    pub fn new<S: Into<String>>(accession: S, sequence: S, target_decoy: TargetDecoy) -> Self {
        Self {
            accession: accession.into(),
            sequence: sequence.into(),
            score: 0.0,
            target_decoy: Some(target_decoy),
            meta: MetaInfo::new(),
            modifications: BTreeMap::new(),
        }
    }

    /// Only proteins labelled `target` or `target+decoy` are targets, an
    /// unlabelled protein is treated as a decoy
    pub fn is_decoy(&self) -> bool {
        !matches!(
            self.target_decoy,
            Some(TargetDecoy::Target | TargetDecoy::TargetDecoy)
        )
    }
}

/// A single search run and the proteins it reported
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProteinIdentification {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub search_engine: String,
    #[serde(default)]
    pub search_engine_version: String,
    #[serde(default)]
    pub score_type: String,
    #[serde(default = "default_true")]
    pub higher_score_better: bool,
    #[serde(default)]
    pub hits: Vec<ProteinHit>,
}

impl ProteinIdentification {
    /// Copy the run metadata with a different set of protein hits
    pub fn with_hits(&self, hits: Vec<ProteinHit>) -> Self {
        Self {
            identifier: self.identifier.clone(),
            search_engine: self.search_engine.clone(),
            search_engine_version: self.search_engine_version.clone(),
            score_type: self.score_type.clone(),
            higher_score_better: self.higher_score_better,
            hits,
        }
    }
}

/// Identification file contents: protein runs plus per-spectrum identifications
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentificationFile {
    #[serde(default)]
    pub proteins: Vec<ProteinIdentification>,
    #[serde(default)]
    pub peptides: Vec<PeptideIdentification>,
}
