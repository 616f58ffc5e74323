//! PSM-level q-value estimation by target/decoy competition

use crate::identification::{MetaValue, PeptideIdentification};
use crate::Error;
use rayon::prelude::*;
use serde::Serialize;

/// Score type assigned to hits once their score has been replaced by a q-value
pub const QVALUE_SCORE_TYPE: &str = "q-value";

/// Estimator settings. Built once by the caller and handed to every
/// estimator invocation unchanged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FdrConfig {
    /// Keep decoys in protein-level bookkeeping
    pub add_decoy_proteins: bool,
    /// Keep decoy hits in the output after q-values are assigned
    pub add_decoy_peptides: bool,
    /// Use every ranked hit, not just the best hit of each spectrum
    pub use_all_hits: bool,
}

pub trait QValueEstimator: Sync {
    /// Replace the score of every hit with its q-value, in place. Returns the
    /// number of target hits with q <= 0.01.
    fn apply(&self, ids: &mut [PeptideIdentification], config: &FdrConfig)
        -> Result<usize, Error>;
}

/// Target/decoy competition: q = #decoys / #targets at or above a score,
/// followed by the reverse cumulative minimum.
#[derive(Copy, Clone, Debug, Default)]
pub struct TargetDecoyEstimator;

struct Row {
    id: usize,
    hit: usize,
    score: f64,
    decoy: bool,
    q: f64,
}

fn is_fdr_score_type(score_type: &str) -> bool {
    let s = score_type.to_ascii_lowercase();
    s == "q-value" || s == "fdr"
}

impl TargetDecoyEstimator {
    /// Validate that all identifications can be ranked together
    fn check(ids: &[PeptideIdentification]) -> Result<(), Error> {
        let first = match ids.iter().find(|id| !id.hits.is_empty()) {
            Some(first) => first,
            None => return Ok(()),
        };

        if is_fdr_score_type(&first.score_type) {
            return Err(Error::Configuration(format!(
                "unsupported score type `{}`: scores are already FDR-transformed",
                first.score_type
            )));
        }

        for id in ids.iter().filter(|id| !id.hits.is_empty()) {
            if id.higher_score_better != first.higher_score_better {
                return Err(Error::Configuration(format!(
                    "spectrum `{}` disagrees on score orientation",
                    id.spectrum_reference
                )));
            }
            if id.score_type != first.score_type {
                return Err(Error::Configuration(format!(
                    "mixed score types `{}` and `{}`",
                    first.score_type, id.score_type
                )));
            }
            if id.hits.iter().any(|hit| hit.target_decoy.is_none()) {
                return Err(Error::Configuration(format!(
                    "spectrum `{}` has hits without target/decoy annotation",
                    id.spectrum_reference
                )));
            }
        }
        Ok(())
    }
}

impl QValueEstimator for TargetDecoyEstimator {
    fn apply(
        &self,
        ids: &mut [PeptideIdentification],
        config: &FdrConfig,
    ) -> Result<usize, Error> {
        Self::check(ids)?;

        let higher_score_better = ids
            .iter()
            .find(|id| !id.hits.is_empty())
            .map(|id| id.higher_score_better)
            .unwrap_or(true);

        let mut rows = ids
            .iter()
            .enumerate()
            .flat_map(|(id_ix, id)| {
                let take = match config.use_all_hits {
                    true => id.hits.len(),
                    false => id.hits.len().min(1),
                };
                id.hits
                    .iter()
                    .take(take)
                    .enumerate()
                    .map(move |(hit_ix, hit)| Row {
                        id: id_ix,
                        hit: hit_ix,
                        score: hit.score,
                        decoy: hit.is_decoy(),
                        q: 1.0,
                    })
            })
            .collect::<Vec<Row>>();

        match higher_score_better {
            true => rows.par_sort_by(|a, b| b.score.total_cmp(&a.score)),
            false => rows.par_sort_by(|a, b| a.score.total_cmp(&b.score)),
        }

        // Tied scores form one acceptance step, so the FDR is evaluated at
        // the end of each block of equal scores
        let mut decoy = 0usize;
        let mut target = 0usize;
        let mut start = 0;
        while start < rows.len() {
            let mut end = start;
            while end < rows.len() && rows[end].score == rows[start].score {
                match rows[end].decoy {
                    true => decoy += 1,
                    false => target += 1,
                }
                end += 1;
            }
            let fdr = match target {
                0 => 1.0,
                _ => (decoy as f64 / target as f64).min(1.0),
            };
            for row in &mut rows[start..end] {
                row.q = fdr;
            }
            start = end;
        }

        // `q = q[::-1].cummin()[::-1]`
        let mut q_min = 1.0f64;
        let mut passing = 0;
        for row in rows.iter_mut().rev() {
            q_min = q_min.min(row.q);
            row.q = q_min;
            if q_min <= 0.01 && !row.decoy {
                passing += 1;
            }
        }

        let mut qvalues = ids
            .iter()
            .map(|id| vec![1.0; id.hits.len()])
            .collect::<Vec<_>>();
        for row in &rows {
            qvalues[row.id][row.hit] = row.q;
        }

        for (id, qs) in ids.iter_mut().zip(qvalues) {
            if id.hits.is_empty() {
                continue;
            }
            let original = match id.score_type.is_empty() {
                true => "original_score".to_string(),
                false => format!("{}_score", id.score_type),
            };
            for (hit, q) in id.hits.iter_mut().zip(qs) {
                hit.meta.insert(original.clone(), MetaValue::Double(hit.score));
                hit.score = q;
            }
            id.score_type = QVALUE_SCORE_TYPE.into();
            id.higher_score_better = false;

            if !config.add_decoy_peptides {
                id.hits.retain(|hit| !hit.is_decoy());
            }
        }

        Ok(passing)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identification::{PeptideHit, TargetDecoy};

    fn psm(score: f64, decoy: bool) -> PeptideIdentification {
        let mut hit = PeptideHit::new("PEPTIDEK", score, 1);
        hit.target_decoy = Some(match decoy {
            true => TargetDecoy::Decoy,
            false => TargetDecoy::Target,
        });
        PeptideIdentification {
            identifier: String::new(),
            rt: 0.0,
            mz: 0.0,
            spectrum_reference: format!("scan={}", score),
            score_type: "NuXL:score".into(),
            higher_score_better: true,
            hits: vec![hit],
            meta: Default::default(),
        }
    }

    fn config() -> FdrConfig {
        FdrConfig {
            add_decoy_proteins: true,
            add_decoy_peptides: true,
            use_all_hits: false,
        }
    }

    #[test]
    fn competition_qvalues() {
        let mut ids = vec![
            psm(10.0, false),
            psm(9.0, false),
            psm(8.0, true),
            psm(7.0, false),
            psm(6.0, false),
            psm(5.0, true),
        ];
        let passing = TargetDecoyEstimator.apply(&mut ids, &config()).unwrap();
        let q = ids.iter().map(|id| id.hits[0].score).collect::<Vec<_>>();
        // 0/1, 0/2, 1/2, 1/3, 1/4, 2/4 -> reverse cummin
        assert_eq!(q, vec![0.0, 0.0, 0.25, 0.25, 0.25, 0.5]);
        assert_eq!(passing, 2);

        assert!(ids.iter().all(|id| id.score_type == QVALUE_SCORE_TYPE));
        assert!(ids.iter().all(|id| !id.higher_score_better));
        assert_eq!(ids[0].hits[0].meta_double("NuXL:score_score"), Some(10.0));
    }

    #[test]
    fn ties_share_a_qvalue() {
        let mut ids = vec![psm(10.0, false), psm(5.0, true), psm(5.0, false)];
        TargetDecoyEstimator.apply(&mut ids, &config()).unwrap();
        assert_eq!(ids[1].hits[0].score, ids[2].hits[0].score);
        assert_eq!(ids[2].hits[0].score, 0.5);
    }

    #[test]
    fn drop_decoys_when_not_requested() {
        let mut ids = vec![psm(10.0, false), psm(9.0, true)];
        let config = FdrConfig {
            add_decoy_peptides: false,
            ..config()
        };
        TargetDecoyEstimator.apply(&mut ids, &config).unwrap();
        assert_eq!(ids[0].hits.len(), 1);
        assert!(ids[1].hits.is_empty());
    }

    #[test]
    fn lower_ranks_only_with_all_hits() {
        let mut id = psm(10.0, false);
        let mut second = PeptideHit::new("DECOYK", 9.0, 2);
        second.target_decoy = Some(TargetDecoy::Decoy);
        id.hits.push(second);

        let mut top_only = vec![id.clone()];
        TargetDecoyEstimator.apply(&mut top_only, &config()).unwrap();
        assert_eq!(top_only[0].hits[0].score, 0.0);
        assert_eq!(top_only[0].hits[1].score, 1.0);

        let mut all = vec![id];
        let config = FdrConfig {
            use_all_hits: true,
            ..config()
        };
        TargetDecoyEstimator.apply(&mut all, &config).unwrap();
        assert_eq!(all[0].hits[0].score, 0.0);
        assert_eq!(all[0].hits[1].score, 1.0);
    }

    #[test]
    fn configuration_errors() {
        let mut mixed = vec![psm(10.0, false), psm(9.0, true)];
        mixed[1].higher_score_better = false;
        assert!(matches!(
            TargetDecoyEstimator.apply(&mut mixed, &config()),
            Err(Error::Configuration(_))
        ));

        let mut unlabelled = vec![psm(10.0, false)];
        unlabelled[0].hits[0].target_decoy = None;
        assert!(matches!(
            TargetDecoyEstimator.apply(&mut unlabelled, &config()),
            Err(Error::Configuration(_))
        ));

        let mut transformed = vec![psm(0.01, false)];
        transformed[0].score_type = "q-value".into();
        assert!(matches!(
            TargetDecoyEstimator.apply(&mut transformed, &config()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn empty_input() {
        let mut ids: Vec<PeptideIdentification> = Vec::new();
        assert_eq!(TargetDecoyEstimator.apply(&mut ids, &config()).unwrap(), 0);
    }
}
