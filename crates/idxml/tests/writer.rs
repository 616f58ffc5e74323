use idxml::IdXmlWriter;
use nuxl_core::identification::{
    PeptideEvidence, PeptideHit, PeptideIdentification, ProteinHit, ProteinIdentification,
    TargetDecoy,
};
use nuxl_core::io::IdentificationWriter;
use nuxl_core::{Error, PersistenceError};

fn run(identifier: &str, accession: &str) -> ProteinIdentification {
    ProteinIdentification {
        identifier: identifier.into(),
        search_engine: "NuXL".into(),
        hits: vec![ProteinHit::new(accession, "MPEPTIDEK", TargetDecoy::Target)],
        ..Default::default()
    }
}

fn spectrum(identifier: &str, sequence: &str, accession: &str) -> PeptideIdentification {
    let mut hit = PeptideHit::new(sequence, 0.0, 1);
    hit.evidences = vec![PeptideEvidence::new(accession, Some(1))];
    PeptideIdentification {
        identifier: identifier.into(),
        rt: 60.0,
        mz: 450.2,
        spectrum_reference: "scan=1 <&".into(),
        score_type: "q-value".into(),
        higher_score_better: false,
        hits: vec![hit],
        meta: Default::default(),
    }
}

#[test]
fn stores_runs_separately() -> Result<(), Error> {
    let path = std::env::temp_dir().join(format!("idxml-writer-{}.idXML", std::process::id()));
    let path = path.to_string_lossy().to_string();

    let writer = IdXmlWriter;
    assert_eq!(writer.extension(), "idXML");
    writer.store(
        &path,
        &[run("a", "P1"), run("b", "P2")],
        &[spectrum("a", "PEPTIDEK", "P1"), spectrum("b", "EPTIDEK", "P2")],
    )?;

    let xml = std::fs::read_to_string(&path).unwrap();
    assert_eq!(xml.matches("<IdentificationRun ").count(), 2);
    assert_eq!(xml.matches("<PeptideIdentification ").count(), 2);
    // Each run numbers its own proteins
    assert_eq!(xml.matches(r#"protein_refs="PH_0""#).count(), 2);
    assert!(xml.contains("scan=1 &lt;&amp;"));

    std::fs::remove_file(&path).unwrap();
    Ok(())
}

#[test]
fn unwritable_path() {
    let err = IdXmlWriter
        .store("/nonexistent-directory/out.idXML", &[], &[])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Persistence {
            source: PersistenceError::Io(_),
            ..
        }
    ));
}
