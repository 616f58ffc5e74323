pub mod fdr;
pub mod filter;
pub mod identification;
pub mod io;
pub mod population;
pub mod qvalue;
pub mod report;

#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
    Format(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::Csv(e) => e.fmt(f),
            Self::Format(e) => f.write_str(e),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// The q-value estimator cannot run on the supplied identifications
    Configuration(String),
    /// An identification or report could not be read or written
    Persistence {
        path: String,
        source: PersistenceError,
    },
}

impl Error {
    pub fn persistence<S: Into<String>>(path: S, source: PersistenceError) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "configuration error: {}", e),
            Self::Persistence { path, source } => write!(f, "`{}`: {}", path, source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Persistence {
                source: PersistenceError::Io(e),
                ..
            } => Some(e),
            Self::Persistence {
                source: PersistenceError::Json(e),
                ..
            } => Some(e),
            Self::Persistence {
                source: PersistenceError::Csv(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}

pub fn read_json<S, T>(path: S) -> Result<T, Error>
where
    S: AsRef<str>,
    T: for<'de> serde::Deserialize<'de>,
{
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::persistence(path, PersistenceError::Io(e)))?;
    serde_json::from_str(&contents).map_err(|e| Error::persistence(path, PersistenceError::Json(e)))
}

/// Load protein and peptide identifications from a JSON identification file
pub fn read_identifications<S: AsRef<str>>(
    path: S,
) -> Result<identification::IdentificationFile, Error> {
    let file: identification::IdentificationFile = read_json(&path)?;
    log::info!(
        "read {} protein runs, {} peptide identifications from {}",
        file.proteins.len(),
        file.peptides.len(),
        path.as_ref()
    );
    Ok(file)
}
