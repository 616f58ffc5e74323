//! Separate FDR control for peptide and crosslink PSMs
//!
//! Unmodified peptides and crosslinked peptides have very different score
//! distributions, so q-values are estimated for each population on its own.
//! Decoys take part in the estimation and are removed right after. The
//! crosslink population is then reported at a cascade of q-value thresholds,
//! loosest first, each one filtered from the same decoy-free population.

use crate::filter::{
    count_hits, filter_hits_by_score, remove_decoy_hits, remove_unreferenced_proteins,
    UnknownAccession,
};
use crate::identification::{PeptideIdentification, ProteinIdentification};
use crate::io::IdentificationWriter;
use crate::population::split_populations;
use crate::qvalue::{FdrConfig, QValueEstimator, TargetDecoyEstimator};
use crate::report::annotate_top_hit_modifications;
use crate::Error;
use log::info;
use rayon::prelude::*;
use serde::Serialize;

/// Replace disabled thresholds (0.0) by 1.0 and sort descending, so that
/// results are generated by applying increasingly stringent filters.
///
/// Thresholds sharing a [`threshold_label`] would write to the same paths,
/// only the first (loosest) of them is kept.
pub fn normalize_thresholds(mut thresholds: Vec<f64>) -> Vec<f64> {
    thresholds
        .iter_mut()
        .filter(|t| **t == 0.0)
        .for_each(|t| *t = 1.0);
    thresholds.sort_by(|a, b| b.total_cmp(a));
    thresholds.dedup_by(|a, b| threshold_label(*a) == threshold_label(*b));
    thresholds
}

/// Threshold as embedded in output file names
pub fn threshold_label(threshold: f64) -> String {
    format!("{:.4}", threshold)
}

/// Thresholds outside of (0, 1) mean "no filtering"
fn filters(threshold: f64) -> bool {
    threshold > 0.0 && threshold < 1.0
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CascadeOptions {
    /// Write decoy proteins to the protein reports
    pub report_decoys: bool,
    /// Generate per-threshold reports on the rayon thread pool
    pub parallel_reports: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PopulationReport {
    pub threshold: f64,
    pub path: String,
    pub psms: usize,
    pub proteins: usize,
    pub inconsistencies: Vec<UnknownAccession>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdReport {
    pub threshold: f64,
    pub psm_path: String,
    pub protein_path: String,
    pub psms: usize,
    /// Number of rows in the protein report
    pub proteins: usize,
    pub inconsistencies: Vec<UnknownAccession>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CascadeReport {
    pub peptides: PopulationReport,
    pub crosslinks: Vec<ThresholdReport>,
}

pub struct XlFdr<E = TargetDecoyEstimator> {
    config: FdrConfig,
    estimator: E,
    options: CascadeOptions,
}

impl XlFdr<TargetDecoyEstimator> {
    pub fn new(report_top_hits: usize) -> Self {
        Self::with_estimator(report_top_hits, TargetDecoyEstimator)
    }
}

impl<E: QValueEstimator> XlFdr<E> {
    pub fn with_estimator(report_top_hits: usize, estimator: E) -> Self {
        Self {
            config: FdrConfig {
                // Decoys stay in the result, e.g. for rescoring downstream
                add_decoy_proteins: true,
                add_decoy_peptides: true,
                use_all_hits: report_top_hits >= 2,
            },
            estimator,
            options: CascadeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CascadeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &FdrConfig {
        &self.config
    }

    /// Annotate every hit with its PSM-level q-value, in place. Returns the
    /// number of target hits at 1% FDR.
    pub fn compute_q_values(&self, ids: &mut [PeptideIdentification]) -> Result<usize, Error> {
        self.estimator.apply(ids, &self.config)
    }

    /// Estimate q-values on `peptides`, drop decoys and hits above
    /// `threshold`, and store the result with the referenced proteins at
    /// `<prefix><threshold>_peptides.<ext>`.
    pub fn filter_peptide_population(
        &self,
        proteins: &[ProteinIdentification],
        mut peptides: Vec<PeptideIdentification>,
        threshold: f64,
        prefix: &str,
        writer: &dyn IdentificationWriter,
    ) -> Result<PopulationReport, Error> {
        let passing = self.compute_q_values(&mut peptides)?;
        info!("discovered {} target peptide PSMs at 1% FDR", passing);

        let mut peptides = remove_decoy_hits(&peptides);
        if filters(threshold) {
            peptides = filter_hits_by_score(&peptides, threshold);
        }

        let (proteins, inconsistencies) = remove_unreferenced_proteins(proteins, &peptides);
        let path = format!(
            "{}{}_peptides.{}",
            prefix,
            threshold_label(threshold),
            writer.extension()
        );
        log::trace!("writing {}", path);
        writer.store(&path, &proteins, &peptides)?;

        Ok(PopulationReport {
            threshold,
            psms: count_hits(&peptides),
            proteins: proteins.iter().map(|run| run.hits.len()).sum(),
            path,
            inconsistencies,
        })
    }

    /// Estimate q-values on `crosslinks` once, drop decoys once, then write a
    /// PSM file and a protein report for every threshold, loosest first.
    ///
    /// All thresholds are attempted even if one of them fails to persist;
    /// the first failure is returned.
    pub fn filter_crosslink_population_cascade(
        &self,
        proteins: &[ProteinIdentification],
        mut crosslinks: Vec<PeptideIdentification>,
        thresholds: &[f64],
        prefix: &str,
        writer: &dyn IdentificationWriter,
    ) -> Result<Vec<ThresholdReport>, Error> {
        let passing = self.compute_q_values(&mut crosslinks)?;
        info!("discovered {} target crosslink PSMs at 1% FDR", passing);

        let crosslinks = remove_decoy_hits(&crosslinks);
        let thresholds = normalize_thresholds(thresholds.to_vec());

        let results: Vec<Result<ThresholdReport, Error>> = match self.options.parallel_reports {
            true => thresholds
                .par_iter()
                .map(|&t| self.report_threshold(proteins, &crosslinks, t, prefix, writer))
                .collect(),
            false => thresholds
                .iter()
                .map(|&t| self.report_threshold(proteins, &crosslinks, t, prefix, writer))
                .collect(),
        };

        let mut reports = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (threshold, result) in thresholds.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    log::error!("crosslink results at q-value {}: {}", threshold, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    fn report_threshold(
        &self,
        proteins: &[ProteinIdentification],
        crosslinks: &[PeptideIdentification],
        threshold: f64,
        prefix: &str,
        writer: &dyn IdentificationWriter,
    ) -> Result<ThresholdReport, Error> {
        info!("writing crosslink results at q-value threshold {}", threshold);
        let filtered = match filters(threshold) {
            true => filter_hits_by_score(crosslinks, threshold),
            false => crosslinks.to_vec(),
        };

        let (mut proteins, mut inconsistencies) =
            remove_unreferenced_proteins(proteins, &filtered);

        let label = threshold_label(threshold);
        let psm_path = format!("{}{}_XLs.{}", prefix, label, writer.extension());
        writer.store(&psm_path, &proteins, &filtered)?;

        let protein_path = format!("{}_proteins{}_XLs.tsv", prefix, label);
        let mut tsv = Vec::new();
        let report = annotate_top_hit_modifications(
            &mut proteins,
            &filtered,
            &mut tsv,
            &protein_path,
            self.options.report_decoys,
        )?;
        writer.store_table(&protein_path, tsv)?;

        for missing in report.inconsistencies {
            if !inconsistencies.contains(&missing) {
                inconsistencies.push(missing);
            }
        }

        info!(
            "- q-value {}: {} crosslink PSMs, {} proteins",
            label,
            count_hits(&filtered),
            report.rows.len()
        );

        Ok(ThresholdReport {
            threshold,
            psm_path,
            protein_path,
            psms: count_hits(&filtered),
            proteins: report.rows.len(),
            inconsistencies,
        })
    }

    /// Split `ids` into peptide and crosslink populations and run the
    /// peptide filter and the crosslink cascade on them.
    pub fn peptide_and_xl_q_values(
        &self,
        proteins: &[ProteinIdentification],
        ids: &[PeptideIdentification],
        peptide_threshold: f64,
        xl_thresholds: &[f64],
        prefix: &str,
        writer: &dyn IdentificationWriter,
    ) -> Result<CascadeReport, Error> {
        let populations = split_populations(ids);
        info!(
            "{} peptide PSMs, {} crosslink PSMs",
            populations.peptides.len(),
            populations.crosslinks.len()
        );

        let peptides = self.filter_peptide_population(
            proteins,
            populations.peptides,
            peptide_threshold,
            prefix,
            writer,
        )?;
        let crosslinks = self.filter_crosslink_population_cascade(
            proteins,
            populations.crosslinks,
            xl_thresholds,
            prefix,
            writer,
        )?;

        Ok(CascadeReport {
            peptides,
            crosslinks,
        })
    }
}
