use super::input::{OutputFormat, Settings};
use anyhow::Context;
use idxml::IdXmlWriter;
use log::info;
use nuxl_core::fdr::{CascadeOptions, CascadeReport, XlFdr};
use nuxl_core::identification::IdentificationFile;
use nuxl_core::io::{IdentificationWriter, JsonWriter};
use serde::Serialize;
use std::time::Instant;

pub struct Runner {
    pub identifications: IdentificationFile,
    pub parameters: Settings,
    start: Instant,
}

#[derive(Serialize)]
struct Summary<'a> {
    #[serde(flatten)]
    parameters: &'a Settings,
    results: &'a CascadeReport,
}

impl Runner {
    pub fn new(parameters: Settings) -> anyhow::Result<Self> {
        let start = Instant::now();
        let identifications = nuxl_core::read_identifications(&parameters.identifications)
            .with_context(|| {
                format!(
                    "Failed to read identifications from `{}`",
                    parameters.identifications
                )
            })?;
        info!(
            "loaded identifications in {}ms",
            (Instant::now() - start).as_millis()
        );
        Ok(Self {
            identifications,
            parameters,
            start,
        })
    }

    fn writer(&self) -> Box<dyn IdentificationWriter> {
        match self.parameters.output_format {
            OutputFormat::IdXml => Box::new(IdXmlWriter),
            OutputFormat::Json => Box::new(JsonWriter),
        }
    }

    pub fn run(mut self) -> anyhow::Result<CascadeReport> {
        let fdr = XlFdr::new(self.parameters.report_top_hits).with_options(CascadeOptions {
            report_decoys: self.parameters.report_decoys,
            parallel_reports: self.parameters.parallel_reports,
        });

        let writer = self.writer();
        let report = fdr.peptide_and_xl_q_values(
            &self.identifications.proteins,
            &self.identifications.peptides,
            self.parameters.peptide_qvalue_threshold,
            &self.parameters.xl_qvalue_thresholds,
            &self.parameters.output_prefix,
            writer.as_ref(),
        )?;

        self.parameters.output_paths.push(report.peptides.path.clone());
        for threshold in &report.crosslinks {
            self.parameters
                .output_paths
                .push(threshold.psm_path.clone());
            self.parameters
                .output_paths
                .push(threshold.protein_path.clone());
        }

        let inconsistencies = report.peptides.inconsistencies.len()
            + report
                .crosslinks
                .iter()
                .map(|t| t.inconsistencies.len())
                .sum::<usize>();
        if inconsistencies > 0 {
            log::warn!(
                "{} peptide evidences reference proteins missing from the input",
                inconsistencies
            );
        }

        let path = format!("{}results.json", self.parameters.output_prefix);
        let summary = Summary {
            parameters: &self.parameters,
            results: &report,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        let bytes = serde_json::to_vec_pretty(&summary)?;
        std::fs::write(&path, bytes).with_context(|| format!("Failed to write `{path}`"))?;

        info!("finished in {}s", (Instant::now() - self.start).as_secs());
        Ok(report)
    }
}
