//! Protein-level crosslink report
//!
//! After filtering, every protein referenced by a surviving PSM is annotated
//! with the crosslink site of its best-scoring hit. The site position is the
//! peptide's start in the protein plus the localized residue within the
//! peptide.

use crate::filter::UnknownAccession;
use crate::identification::{
    meta, PeptideIdentification, ProteinIdentification, ProteinModification,
};
use crate::{Error, PersistenceError};
use fnv::{FnvHashMap, FnvHashSet};
use serde::Serialize;
use std::io::Write;

/// Accession lookup into the hits of a single [`ProteinIdentification`],
/// split by target/decoy label. Indices are only valid for the run the index
/// was built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessionIndex {
    pub targets: FnvHashMap<String, usize>,
    pub decoys: FnvHashMap<String, usize>,
}

impl AccessionIndex {
    /// Look up an accession, preferring the class matching `decoy`
    pub fn get(&self, accession: &str, decoy: bool) -> Option<usize> {
        let (first, second) = match decoy {
            true => (&self.decoys, &self.targets),
            false => (&self.targets, &self.decoys),
        };
        first
            .get(accession)
            .or_else(|| second.get(accession))
            .copied()
    }
}

/// Build accession -> position maps for target and decoy proteins.
///
/// Proteins sharing an accession within the same class overwrite each other,
/// the last one wins.
pub fn partition_accessions(run: &ProteinIdentification) -> AccessionIndex {
    let mut index = AccessionIndex::default();
    for (ix, protein) in run.hits.iter().enumerate() {
        let map = match protein.is_decoy() {
            true => &mut index.decoys,
            false => &mut index.targets,
        };
        if let Some(prev) = map.insert(protein.accession.clone(), ix) {
            log::debug!(
                "duplicate accession `{}` in run `{}` (positions {} and {})",
                protein.accession,
                run.identifier,
                prev,
                ix
            );
        }
    }
    index
}

/// One line of the protein report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProteinReportRow {
    pub accession: String,
    pub target_decoy: String,
    /// Number of surviving PSMs referencing the protein
    pub psms: usize,
    pub top_peptide: String,
    pub top_score: f64,
    /// 1-based crosslink site in the protein, if localized
    pub position: Option<usize>,
    pub residue: Option<char>,
    pub modification: String,
    pub modification_mass: f64,
    pub annotated_sequence: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProteinReport {
    pub rows: Vec<ProteinReportRow>,
    pub inconsistencies: Vec<UnknownAccession>,
}

const HEADERS: [&str; 10] = [
    "accession",
    "target_decoy",
    "psms",
    "top_peptide",
    "top_score",
    "position",
    "residue",
    "modification",
    "modification_mass",
    "annotated_sequence",
];

struct TopHit {
    id: usize,
    hit: usize,
    start: Option<usize>,
    psms: usize,
    /// Last (identification, hit) counted towards `psms`
    counted: (usize, usize),
}

/// Lower-case the residues carrying a crosslink
fn annotate_sequence(sequence: &str, sites: impl Iterator<Item = usize>) -> String {
    let sites = sites.collect::<FnvHashSet<_>>();
    sequence
        .chars()
        .enumerate()
        .map(|(ix, ch)| match sites.contains(&ix) {
            true => ch.to_ascii_lowercase(),
            false => ch,
        })
        .collect()
}

fn serialize_row(row: &ProteinReportRow) -> csv::ByteRecord {
    let mut record = csv::ByteRecord::new();
    record.push_field(row.accession.as_bytes());
    record.push_field(row.target_decoy.as_bytes());
    record.push_field(itoa::Buffer::new().format(row.psms).as_bytes());
    record.push_field(row.top_peptide.as_bytes());
    record.push_field(ryu::Buffer::new().format(row.top_score).as_bytes());
    match row.position {
        Some(pos) => record.push_field(itoa::Buffer::new().format(pos).as_bytes()),
        None => record.push_field(b""),
    }
    match row.residue {
        Some(residue) => record.push_field(residue.to_string().as_bytes()),
        None => record.push_field(b""),
    }
    record.push_field(row.modification.as_bytes());
    record.push_field(ryu::Buffer::new().format(row.modification_mass).as_bytes());
    record.push_field(row.annotated_sequence.as_bytes());
    record
}

/// Annotate proteins with the crosslink site of their best-scoring hit and
/// write one tab-separated row per annotated protein to `sink`.
///
/// Proteins are reported in the order they are first referenced by
/// `peptides`. Decoy proteins are annotated but only reported when
/// `report_decoys` is set. Hits referencing unknown accessions are skipped
/// and returned in [`ProteinReport::inconsistencies`]. `path` names the
/// destination of `sink` in errors.
pub fn annotate_top_hit_modifications<W: Write>(
    proteins: &mut [ProteinIdentification],
    peptides: &[PeptideIdentification],
    sink: W,
    path: &str,
    report_decoys: bool,
) -> Result<ProteinReport, Error> {
    let mut report = ProteinReport::default();
    let mut reported = FnvHashSet::default();

    for run in proteins.iter_mut() {
        let index = partition_accessions(run);
        let mut top: Vec<Option<TopHit>> = (0..run.hits.len()).map(|_| None).collect();
        let mut order = Vec::new();

        for (id_ix, id) in peptides.iter().enumerate() {
            if !id.identifier.is_empty() && id.identifier != run.identifier {
                continue;
            }
            for (hit_ix, hit) in id.hits.iter().enumerate() {
                for evidence in &hit.evidences {
                    let ix = match index.get(&evidence.accession, hit.is_decoy()) {
                        Some(ix) => ix,
                        None => {
                            let missing = UnknownAccession {
                                accession: evidence.accession.clone(),
                                spectrum_reference: id.spectrum_reference.clone(),
                            };
                            if reported.insert(missing.clone()) {
                                log::warn!("{}", missing);
                                report.inconsistencies.push(missing);
                            }
                            continue;
                        }
                    };

                    match &mut top[ix] {
                        Some(current) => {
                            // A peptide occurring several times in one protein is one PSM
                            if current.counted != (id_ix, hit_ix) {
                                current.counted = (id_ix, hit_ix);
                                current.psms += 1;
                            }
                            let best = &peptides[current.id].hits[current.hit];
                            if id.is_better(hit.score, best.score) {
                                current.id = id_ix;
                                current.hit = hit_ix;
                                current.start = evidence.start;
                            }
                        }
                        slot => {
                            order.push(ix);
                            *slot = Some(TopHit {
                                id: id_ix,
                                hit: hit_ix,
                                start: evidence.start,
                                psms: 1,
                                counted: (id_ix, hit_ix),
                            });
                        }
                    }
                }
            }
        }

        for ix in order {
            let top = match &top[ix] {
                Some(top) => top,
                None => continue,
            };
            let hit = &peptides[top.id].hits[top.hit];
            let protein = &mut run.hits[ix];

            let position = match (top.start, hit.meta_int(meta::BEST_LOCALIZATION_POSITION)) {
                (Some(start), Some(loc)) if loc >= 0 => Some(start + loc as usize),
                _ => None,
            }
            .filter(|&pos| pos < protein.sequence.len());
            let residue = position.and_then(|pos| protein.sequence.chars().nth(pos));

            let modification = ProteinModification {
                residue,
                name: hit.meta_string(meta::NA).unwrap_or_default(),
                mass: hit.meta_double(meta::NA_MASS).unwrap_or_default(),
                peptide: hit.sequence.clone(),
            };

            protein.modifications.clear();
            if let Some(pos) = position {
                protein.modifications.insert(pos, modification.clone());
            }

            if protein.is_decoy() && !report_decoys {
                continue;
            }

            report.rows.push(ProteinReportRow {
                accession: protein.accession.clone(),
                target_decoy: protein
                    .target_decoy
                    .map(|td| td.to_string())
                    .unwrap_or_default(),
                psms: top.psms,
                top_peptide: hit.sequence.clone(),
                top_score: hit.score,
                position: position.map(|pos| pos + 1),
                residue,
                modification: modification.name,
                modification_mass: modification.mass,
                annotated_sequence: annotate_sequence(
                    &protein.sequence,
                    protein.modifications.keys().copied(),
                ),
            });
        }
    }

    write_report(&report.rows, sink, path)?;
    Ok(report)
}

/// Write report rows as tab-separated values, `path` names the destination
/// of `sink` in errors
pub fn write_report<W: Write>(
    rows: &[ProteinReportRow],
    sink: W,
    path: &str,
) -> Result<(), Error> {
    let csv_err = |e: csv::Error| Error::persistence(path, PersistenceError::Csv(e));
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(sink);
    wtr.write_byte_record(&csv::ByteRecord::from(HEADERS.to_vec()))
        .map_err(csv_err)?;
    for row in rows {
        wtr.write_byte_record(&serialize_row(row)).map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| Error::persistence(path, PersistenceError::Io(e)))
}
