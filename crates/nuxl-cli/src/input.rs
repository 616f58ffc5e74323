use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    IdXml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idxml" => Ok(OutputFormat::IdXml),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format `{s}`, expected `idxml` or `json`")),
        }
    }
}

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub identifications: String,
    pub output_prefix: String,
    pub output_format: OutputFormat,
    pub peptide_qvalue_threshold: f64,
    pub xl_qvalue_thresholds: Vec<f64>,
    pub report_top_hits: usize,
    pub report_decoys: bool,
    pub parallel_reports: bool,
    pub output_paths: Vec<String>,
}

#[derive(Deserialize, Default)]
/// Input parameters deserialized from JSON file
pub struct Input {
    identifications: Option<String>,
    output_prefix: Option<String>,
    output_format: Option<OutputFormat>,
    peptide_qvalue_threshold: Option<f64>,
    xl_qvalue_thresholds: Option<Vec<f64>>,
    report_top_hits: Option<usize>,
    report_decoys: Option<bool>,
    parallel_reports: Option<bool>,
}

/// Clamp a q-value threshold into [0, 1]. Out-of-range values are a likely
/// typo (e.g. `5` meaning 5%), so they are reported.
fn check_threshold(name: &str, threshold: f64) -> anyhow::Result<f64> {
    ensure!(!threshold.is_nan(), "`{}` must be a number", name);
    if !(0.0..=1.0).contains(&threshold) {
        let clamped = threshold.clamp(0.0, 1.0);
        log::warn!(
            "`{}` = {} is outside of [0, 1], using {}",
            name,
            threshold,
            clamped
        );
        return Ok(clamped);
    }
    Ok(threshold)
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let mut input = match matches.get_one::<String>("parameters") {
            Some(path) => Input::load(path)
                .with_context(|| format!("Failed to read parameters from `{path}`"))?,
            None => Input::default(),
        };

        // Handle JSON configuration overrides
        if let Some(identifications) = matches.get_one::<String>("identifications") {
            log::trace!("overriding `identifications` parameter.");
            input.identifications = Some(identifications.into());
        }
        if let Some(prefix) = matches.get_one::<String>("output_prefix") {
            log::trace!("overriding `output_prefix` parameter.");
            input.output_prefix = Some(prefix.into());
        }
        if let Some(format) = matches.get_one::<OutputFormat>("output_format") {
            log::trace!("overriding `output_format` parameter.");
            input.output_format = Some(*format);
        }
        if let Some(thresholds) = matches.get_many::<f64>("xl_fdr") {
            log::trace!("overriding `xl_qvalue_thresholds` parameter.");
            input.xl_qvalue_thresholds = Some(thresholds.copied().collect());
        }
        if let Some(threshold) = matches.get_one::<f64>("peptide_fdr") {
            log::trace!("overriding `peptide_qvalue_threshold` parameter.");
            input.peptide_qvalue_threshold = Some(*threshold);
        }
        if let Some(top) = matches.get_one::<usize>("report_top_hits") {
            log::trace!("overriding `report_top_hits` parameter.");
            input.report_top_hits = Some(*top);
        }
        if matches.get_flag("report_decoys") {
            input.report_decoys = Some(true);
        }
        if matches.get_flag("parallel_reports") {
            input.parallel_reports = Some(true);
        }

        ensure!(
            input.identifications.is_some(),
            "`identifications` must be set. For more information try '--help'"
        );
        ensure!(
            input.output_prefix.is_some(),
            "`output_prefix` must be set. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        nuxl_core::read_json(path).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let identifications = self
            .identifications
            .context("'identifications' must be provided!")?;
        let output_prefix = self
            .output_prefix
            .context("'output_prefix' must be provided!")?;

        let peptide_qvalue_threshold = check_threshold(
            "peptide_qvalue_threshold",
            self.peptide_qvalue_threshold.unwrap_or(0.01),
        )?;
        let xl_qvalue_thresholds = self
            .xl_qvalue_thresholds
            .unwrap_or_else(|| vec![0.01, 0.05, 0.1])
            .into_iter()
            .map(|t| check_threshold("xl_qvalue_thresholds", t))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if xl_qvalue_thresholds.is_empty() {
            log::warn!("`xl_qvalue_thresholds` is empty, no crosslink results will be written");
        }

        let mut report_top_hits = self.report_top_hits.unwrap_or(1);
        if report_top_hits == 0 {
            log::warn!("`report_top_hits` must be at least 1. Setting `report_top_hits: 1`");
            report_top_hits = 1;
        }

        // `out/` is a directory, `out/sample_` is a directory plus a file stem
        let directory = match output_prefix.ends_with('/') || output_prefix.ends_with('\\') {
            true => Some(Path::new(&output_prefix)),
            false => Path::new(&output_prefix)
                .parent()
                .filter(|p| !p.as_os_str().is_empty()),
        };
        if let Some(directory) = directory {
            std::fs::create_dir_all(directory).with_context(|| {
                format!("Failed to create output directory `{}`", directory.display())
            })?;
        }

        Ok(Settings {
            version: clap::crate_version!().into(),
            identifications,
            output_format: self.output_format.unwrap_or_default(),
            peptide_qvalue_threshold,
            xl_qvalue_thresholds,
            report_top_hits,
            report_decoys: self.report_decoys.unwrap_or(false),
            parallel_reports: self.parallel_reports.unwrap_or(false),
            output_paths: Vec::new(),
            output_prefix,
        })
    }
}
