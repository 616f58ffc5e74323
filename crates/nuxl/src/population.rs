//! Separate unmodified peptide matches from crosslinked matches

use crate::identification::{PeptideHit, PeptideIdentification};

/// The two PSM populations whose q-values are estimated independently
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Populations {
    pub peptides: Vec<PeptideIdentification>,
    pub crosslinks: Vec<PeptideIdentification>,
}

/// Split identifications into a peptide and a crosslink population.
///
/// Every spectrum contributes at most one hit to each population: the first
/// hit (hits are rank ordered) that qualifies for it. Spectra without a
/// qualifying hit are left out of that population. The input is not modified.
pub fn split_populations(ids: &[PeptideIdentification]) -> Populations {
    let mut populations = Populations::default();
    for id in ids {
        let best = |crosslink: bool| -> Option<PeptideHit> {
            id.hits
                .iter()
                .find(|hit| hit.is_crosslink() == crosslink)
                .cloned()
        };

        if let Some(hit) = best(false) {
            populations.peptides.push(id.with_hits(vec![hit]));
        }
        if let Some(hit) = best(true) {
            populations.crosslinks.push(id.with_hits(vec![hit]));
        }
    }

    log::trace!(
        "split {} spectra into {} peptide and {} crosslink PSMs",
        ids.len(),
        populations.peptides.len(),
        populations.crosslinks.len()
    );
    populations
}
