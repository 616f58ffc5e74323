use nuxl_core::identification::{
    MetaInfo, PeptideIdentification, ProteinIdentification,
};
use nuxl_core::io::{write_bytes, IdentificationWriter};
use nuxl_core::{Error, PersistenceError};
use serde::Serialize;
use std::borrow::Cow;
mod run;
use run::IdentificationRun;

const VERSION: &str = "1.5";
const SCHEMA_LOCATION: &str = "https://www.openms.de/xml-schema/IdXML_1_5.xsd";
const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Serialize)]
pub struct UserParam {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@value")]
    value: String,
}

impl UserParam {
    pub fn new<S: Into<String>>(kind: &'static str, name: S, value: String) -> Self {
        Self {
            kind,
            name: name.into(),
            value,
        }
    }

    pub fn from_meta(meta: &MetaInfo) -> Vec<UserParam> {
        meta.iter()
            .map(|(name, value)| UserParam::new(value.type_name(), name, value.to_string()))
            .collect()
    }
}

#[derive(Serialize)]
pub struct SearchParameters {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@db")]
    db: String,
    #[serde(rename = "@mass_type")]
    mass_type: &'static str,
    #[serde(rename = "@enzyme")]
    enzyme: &'static str,
}

#[derive(Serialize)]
pub struct IdXml {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@xsi:noNamespaceSchemaLocation")]
    schema_location: &'static str,
    #[serde(rename = "@xmlns:xsi")]
    xsi: &'static str,

    #[serde(rename = "SearchParameters")]
    search_parameters: Vec<SearchParameters>,
    #[serde(rename = "IdentificationRun")]
    runs: Vec<IdentificationRun>,
}

impl IdXml {
    /// Group peptide identifications under the protein run they reference.
    /// Peptides without a run identifier are attached to the first run.
    /// Peptides naming a run absent from `proteins` get an empty run of
    /// their own.
    pub fn new(proteins: &[ProteinIdentification], peptides: &[PeptideIdentification]) -> Self {
        let mut proteins = proteins.iter().map(Cow::Borrowed).collect::<Vec<_>>();
        let mut assigned = Vec::with_capacity(peptides.len());
        for id in peptides {
            let run = match id.identifier.is_empty() {
                true => (!proteins.is_empty()).then_some(0),
                false => proteins
                    .iter()
                    .position(|run| run.identifier == id.identifier),
            };
            let run = match run {
                Some(run) => run,
                None => {
                    log::warn!(
                        "spectrum `{}` references unknown run `{}`, writing it to an empty run",
                        id.spectrum_reference,
                        id.identifier
                    );
                    proteins.push(Cow::Owned(ProteinIdentification {
                        identifier: id.identifier.clone(),
                        ..Default::default()
                    }));
                    proteins.len() - 1
                }
            };
            assigned.push(run);
        }

        let mut search_parameters = Vec::new();
        let mut runs = Vec::new();
        for (ix, protein_id) in proteins.iter().enumerate() {
            let peptide_ids = peptides
                .iter()
                .zip(&assigned)
                .filter(|(_, run)| **run == ix)
                .map(|(id, _)| id)
                .collect::<Vec<_>>();

            let sp = format!("SP_{}", ix);
            search_parameters.push(SearchParameters {
                id: sp.clone(),
                db: String::new(),
                mass_type: "monoisotopic",
                enzyme: "unknown_enzyme",
            });
            runs.push(IdentificationRun::new(protein_id, &peptide_ids, sp));
        }

        Self {
            version: VERSION,
            schema_location: SCHEMA_LOCATION,
            xsi: XSI,
            search_parameters,
            runs,
        }
    }

    pub fn to_xml(&self) -> Result<String, quick_xml::DeError> {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&quick_xml::se::to_string_with_root("IdXML", self)?);
        xml.push('\n');
        Ok(xml)
    }
}

/// Writes identifications as idXML documents
#[derive(Copy, Clone, Debug, Default)]
pub struct IdXmlWriter;

impl IdentificationWriter for IdXmlWriter {
    fn extension(&self) -> &str {
        "idXML"
    }

    fn store(
        &self,
        path: &str,
        proteins: &[ProteinIdentification],
        peptides: &[PeptideIdentification],
    ) -> Result<(), Error> {
        let xml = IdXml::new(proteins, peptides)
            .to_xml()
            .map_err(|e| Error::persistence(path, PersistenceError::Format(e.to_string())))?;
        log::trace!("writing {} ({} bytes)", path, xml.len());
        write_bytes(path, xml.into_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nuxl_core::identification::{
        meta, PeptideEvidence, PeptideHit, ProteinHit, ProteinModification, TargetDecoy,
    };

    fn sample() -> (Vec<ProteinIdentification>, Vec<PeptideIdentification>) {
        let mut protein = ProteinHit::new("P1", "MKLAAGKTR", TargetDecoy::Target);
        protein.modifications.insert(
            1,
            ProteinModification {
                residue: Some('K'),
                name: "U-H2O".into(),
                mass: 306.0253,
                peptide: "KLAAGK".into(),
            },
        );
        let proteins = vec![ProteinIdentification {
            identifier: "run_1".into(),
            search_engine: "NuXL".into(),
            score_type: "NuXL:score".into(),
            higher_score_better: true,
            hits: vec![protein, ProteinHit::new("P2", "MSEQNK", TargetDecoy::Target)],
            ..Default::default()
        }];

        let mut hit = PeptideHit::new("KLAAGK", 0.001, 1);
        hit.charge = 3;
        hit.target_decoy = Some(TargetDecoy::Target);
        hit.evidences = vec![
            PeptideEvidence {
                accession: "P1".into(),
                start: Some(1),
                end: Some(6),
            },
            PeptideEvidence::new("UNKNOWN", None),
        ];
        hit.set_meta(meta::IS_XL, 1i64);
        hit.set_meta(meta::NA, "U-H2O");

        let peptides = vec![PeptideIdentification {
            identifier: "run_1".into(),
            rt: 1234.5,
            mz: 612.3,
            spectrum_reference: "scan=42".into(),
            score_type: "q-value".into(),
            higher_score_better: false,
            hits: vec![hit],
            meta: Default::default(),
        }];
        (proteins, peptides)
    }

    #[test]
    fn document_structure() {
        let (proteins, peptides) = sample();
        let xml = IdXml::new(&proteins, &peptides).to_xml().unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<IdXML "));
        assert!(xml.contains(r#"version="1.5""#));
        assert!(xml.contains("<IdentificationRun "));
        assert!(xml.contains(r#"search_engine="NuXL""#));
        assert!(xml.contains(r#"accession="P1""#));
        assert!(xml.contains(r#"id="PH_1""#));
        assert!(xml.contains(r#"protein_refs="PH_0""#));
        assert!(xml.contains(r#"spectrum_reference="scan=42""#));
        assert!(xml.contains(r#"sequence="KLAAGK""#));
        assert!(xml.contains(r#"name="NuXL:NA""#));
        assert!(xml.contains(r#"name="NuXL:xl_sites""#));
        assert!(xml.contains(r#"value="K2:U-H2O""#));
        assert!(!xml.contains("UNKNOWN"));
    }

    #[test]
    fn empty_result_is_valid() {
        let (proteins, _) = sample();
        let xml = IdXml::new(&proteins, &[]).to_xml().unwrap();
        assert!(xml.contains("<IdentificationRun "));
        assert!(!xml.contains("<PeptideIdentification"));
    }

    #[test]
    fn peptides_without_protein_runs() {
        let (_, peptides) = sample();
        let xml = IdXml::new(&[], &peptides).to_xml().unwrap();
        assert!(xml.contains("<PeptideIdentification "));
    }

    #[test]
    fn peptides_of_unknown_runs_are_kept() {
        let (proteins, mut peptides) = sample();
        let mut other = peptides[0].clone();
        other.identifier = "run_2".into();
        other.spectrum_reference = "scan=7".into();
        peptides.push(other.clone());
        other.spectrum_reference = "scan=8".into();
        peptides.push(other);

        let xml = IdXml::new(&proteins, &peptides).to_xml().unwrap();
        assert!(xml.contains(r#"spectrum_reference="scan=42""#));
        assert!(xml.contains(r#"spectrum_reference="scan=7""#));
        assert!(xml.contains(r#"spectrum_reference="scan=8""#));
        assert_eq!(xml.matches("<IdentificationRun ").count(), 2);
        assert_eq!(xml.matches("<PeptideIdentification ").count(), 3);

        let xml = IdXml::new(&[], &peptides).to_xml().unwrap();
        assert_eq!(xml.matches("<IdentificationRun ").count(), 2);
        assert_eq!(xml.matches("<PeptideIdentification ").count(), 3);
    }
}
