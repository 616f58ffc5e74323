//! Persistence contracts used by the FDR cascade

use crate::identification::{IdentificationFile, PeptideIdentification, ProteinIdentification};
use crate::{Error, PersistenceError};

/// Stores filtered identifications and tabular reports.
///
/// Implementations must be safe to call from several threads at once:
/// per-threshold reports may be generated in parallel, each writing to a
/// distinct path.
pub trait IdentificationWriter: Sync {
    /// File extension (without the dot) used for identification outputs
    fn extension(&self) -> &str;

    fn store(
        &self,
        path: &str,
        proteins: &[ProteinIdentification],
        peptides: &[PeptideIdentification],
    ) -> Result<(), Error>;

    /// Persist an already rendered tabular report
    fn store_table(&self, path: &str, bytes: Vec<u8>) -> Result<(), Error> {
        write_bytes(path, bytes)
    }
}

pub fn write_bytes(path: &str, bytes: Vec<u8>) -> Result<(), Error> {
    std::fs::write(path, bytes).map_err(|e| Error::persistence(path, PersistenceError::Io(e)))
}

/// Writes identifications as pretty-printed JSON, readable by
/// [`crate::read_identifications`]
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonWriter;

impl IdentificationWriter for JsonWriter {
    fn extension(&self) -> &str {
        "json"
    }

    fn store(
        &self,
        path: &str,
        proteins: &[ProteinIdentification],
        peptides: &[PeptideIdentification],
    ) -> Result<(), Error> {
        let file = IdentificationFile {
            proteins: proteins.to_vec(),
            peptides: peptides.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| Error::persistence(path, PersistenceError::Json(e)))?;
        write_bytes(path, bytes)
    }
}
