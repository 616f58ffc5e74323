use std::collections::HashMap;

use nuxl_core::identification::{meta, ProteinHit as CoreProteinHit};

use super::*;

#[derive(Serialize)]
struct ProteinHit {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@accession")]
    accession: String,
    #[serde(rename = "@score")]
    score: f64,
    #[serde(rename = "@sequence")]
    sequence: String,
    #[serde(rename = "UserParam")]
    params: Vec<UserParam>,
}

#[derive(Serialize)]
struct ProteinIdentificationElement {
    #[serde(rename = "@score_type")]
    score_type: String,
    #[serde(rename = "@higher_score_better")]
    higher_score_better: bool,
    #[serde(rename = "@significance_threshold")]
    significance_threshold: f64,
    #[serde(rename = "ProteinHit")]
    hits: Vec<ProteinHit>,
}

#[derive(Serialize)]
struct PeptideHit {
    #[serde(rename = "@score")]
    score: f64,
    #[serde(rename = "@sequence")]
    sequence: String,
    #[serde(rename = "@charge")]
    charge: i32,
    #[serde(rename = "@protein_refs", skip_serializing_if = "Option::is_none")]
    protein_refs: Option<String>,
    #[serde(rename = "@start", skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(rename = "@end", skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(rename = "UserParam")]
    params: Vec<UserParam>,
}

#[derive(Serialize)]
struct PeptideIdentificationElement {
    #[serde(rename = "@score_type")]
    score_type: String,
    #[serde(rename = "@higher_score_better")]
    higher_score_better: bool,
    #[serde(rename = "@significance_threshold")]
    significance_threshold: f64,
    #[serde(rename = "@MZ")]
    mz: f64,
    #[serde(rename = "@RT")]
    rt: f64,
    #[serde(rename = "@spectrum_reference")]
    spectrum_reference: String,
    #[serde(rename = "PeptideHit")]
    hits: Vec<PeptideHit>,
    #[serde(rename = "UserParam")]
    params: Vec<UserParam>,
}

/// One search run: its protein hits and the spectra searched in it
#[derive(Serialize)]
pub struct IdentificationRun {
    #[serde(rename = "@search_engine")]
    search_engine: String,
    #[serde(rename = "@search_engine_version")]
    search_engine_version: String,
    #[serde(rename = "@search_parameters_ref")]
    search_parameters_ref: String,
    #[serde(rename = "ProteinIdentification")]
    protein_identification: ProteinIdentificationElement,
    #[serde(rename = "PeptideIdentification")]
    peptide_identifications: Vec<PeptideIdentificationElement>,
}

/// Crosslink sites as `<residue><1-based position>:<adduct>`
fn xl_sites(protein: &CoreProteinHit) -> Option<UserParam> {
    if protein.modifications.is_empty() {
        return None;
    }
    let sites = protein
        .modifications
        .iter()
        .map(|(pos, m)| {
            format!(
                "{}{}:{}",
                m.residue.map(String::from).unwrap_or_default(),
                pos + 1,
                m.name
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    Some(UserParam::new("string", "NuXL:xl_sites", sites))
}

fn join_some<I: Iterator<Item = Option<usize>>>(values: I) -> Option<String> {
    let values = values.collect::<Option<Vec<_>>>()?;
    match values.is_empty() {
        true => None,
        false => Some(
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        ),
    }
}

impl IdentificationRun {
    pub fn new(
        protein_id: &ProteinIdentification,
        peptide_ids: &[&PeptideIdentification],
        search_parameters_ref: String,
    ) -> Self {
        let mut refs: HashMap<&str, String> = HashMap::new();
        let hits = protein_id
            .hits
            .iter()
            .enumerate()
            .map(|(ix, protein)| {
                let id = format!("PH_{}", ix);
                refs.insert(protein.accession.as_str(), id.clone());

                let mut params = UserParam::from_meta(&protein.meta);
                if let Some(td) = protein.target_decoy {
                    params.push(UserParam::new(
                        "string",
                        meta::TARGET_DECOY,
                        td.to_string(),
                    ));
                }
                params.extend(xl_sites(protein));

                ProteinHit {
                    id,
                    accession: protein.accession.clone(),
                    score: protein.score,
                    sequence: protein.sequence.clone(),
                    params,
                }
            })
            .collect();

        let peptide_identifications = peptide_ids
            .iter()
            .map(|id| PeptideIdentificationElement {
                score_type: id.score_type.clone(),
                higher_score_better: id.higher_score_better,
                significance_threshold: 0.0,
                mz: id.mz,
                rt: id.rt,
                spectrum_reference: id.spectrum_reference.clone(),
                hits: id
                    .hits
                    .iter()
                    .map(|hit| {
                        // Evidence referencing proteins absent from this run is left out
                        let evidences = hit
                            .evidences
                            .iter()
                            .filter_map(|ev| refs.get(ev.accession.as_str()).map(|r| (r, ev)))
                            .collect::<Vec<_>>();

                        let mut params = UserParam::from_meta(&hit.meta);
                        if let Some(td) = hit.target_decoy {
                            params.push(UserParam::new(
                                "string",
                                meta::TARGET_DECOY,
                                td.to_string(),
                            ));
                        }

                        PeptideHit {
                            score: hit.score,
                            sequence: hit.sequence.clone(),
                            charge: hit.charge,
                            protein_refs: match evidences.is_empty() {
                                true => None,
                                false => Some(
                                    evidences
                                        .iter()
                                        .map(|(r, _)| r.as_str())
                                        .collect::<Vec<_>>()
                                        .join(" "),
                                ),
                            },
                            start: join_some(evidences.iter().map(|(_, ev)| ev.start)),
                            end: join_some(evidences.iter().map(|(_, ev)| ev.end)),
                            params,
                        }
                    })
                    .collect(),
                params: UserParam::from_meta(&id.meta),
            })
            .collect();

        Self {
            search_engine: protein_id.search_engine.clone(),
            search_engine_version: protein_id.search_engine_version.clone(),
            search_parameters_ref,
            protein_identification: ProteinIdentificationElement {
                score_type: protein_id.score_type.clone(),
                higher_score_better: protein_id.higher_score_better,
                significance_threshold: 0.0,
                hits,
            },
            peptide_identifications,
        }
    }
}
