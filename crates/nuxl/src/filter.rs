//! Identification filters. Each filter returns a new collection and leaves
//! its input untouched.

use crate::identification::{PeptideHit, PeptideIdentification, ProteinIdentification};
use fnv::{FnvHashMap, FnvHashSet};
use serde::Serialize;

/// A hit references a protein accession that is not part of the protein
/// collection. Recorded and skipped, never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct UnknownAccession {
    pub accession: String,
    pub spectrum_reference: String,
}

impl std::fmt::Display for UnknownAccession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "spectrum `{}` references unknown protein `{}`",
            self.spectrum_reference, self.accession
        )
    }
}

/// Keep only hits matching `predicate`, dropping identifications left empty
fn retain_hits<F>(ids: &[PeptideIdentification], predicate: F) -> Vec<PeptideIdentification>
where
    F: Fn(&PeptideIdentification, &PeptideHit) -> bool,
{
    ids.iter()
        .filter_map(|id| {
            let hits = id
                .hits
                .iter()
                .filter(|hit| predicate(id, hit))
                .cloned()
                .collect::<Vec<_>>();
            match hits.is_empty() {
                true => None,
                false => Some(id.with_hits(hits)),
            }
        })
        .collect()
}

/// Remove hits labelled as decoys. Hits shared between target and decoy
/// sequences are kept.
pub fn remove_decoy_hits(ids: &[PeptideIdentification]) -> Vec<PeptideIdentification> {
    retain_hits(ids, |_, hit| !hit.is_decoy())
}

/// Keep hits scoring at least as well as `threshold`, honoring each
/// identification's score orientation
pub fn filter_hits_by_score(
    ids: &[PeptideIdentification],
    threshold: f64,
) -> Vec<PeptideIdentification> {
    retain_hits(ids, |id, hit| id.at_least_as_good(hit.score, threshold))
}

/// Number of hits across all identifications
pub fn count_hits(ids: &[PeptideIdentification]) -> usize {
    ids.iter().map(|id| id.hits.len()).sum()
}

fn belongs_to(id: &PeptideIdentification, run: &ProteinIdentification) -> bool {
    id.identifier.is_empty() || id.identifier == run.identifier
}

/// Restrict every protein run to the proteins referenced by `peptides`.
///
/// Surviving proteins are ordered by their first reference in `peptides`.
/// References to accessions missing from a run are returned alongside the
/// filtered runs.
pub fn remove_unreferenced_proteins(
    proteins: &[ProteinIdentification],
    peptides: &[PeptideIdentification],
) -> (Vec<ProteinIdentification>, Vec<UnknownAccession>) {
    let mut unknown = Vec::new();
    let mut reported = FnvHashSet::default();

    let runs = proteins
        .iter()
        .map(|run| {
            let mut index: FnvHashMap<&str, Vec<usize>> = FnvHashMap::default();
            for (ix, hit) in run.hits.iter().enumerate() {
                index.entry(hit.accession.as_str()).or_default().push(ix);
            }

            let mut taken = vec![false; run.hits.len()];
            let mut order = Vec::new();
            for id in peptides.iter().filter(|id| belongs_to(id, run)) {
                for accession in id.hits.iter().flat_map(|hit| hit.accessions()) {
                    match index.get(accession) {
                        Some(ixs) => {
                            for &ix in ixs {
                                if !taken[ix] {
                                    taken[ix] = true;
                                    order.push(ix);
                                }
                            }
                        }
                        None => {
                            let missing = UnknownAccession {
                                accession: accession.to_string(),
                                spectrum_reference: id.spectrum_reference.clone(),
                            };
                            if reported.insert(missing.clone()) {
                                log::warn!("{}", missing);
                                unknown.push(missing);
                            }
                        }
                    }
                }
            }

            run.with_hits(order.into_iter().map(|ix| run.hits[ix].clone()).collect())
        })
        .collect();

    (runs, unknown)
}
