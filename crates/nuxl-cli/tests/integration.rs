use nuxl_cli::input::Input;
use nuxl_cli::runner::Runner;
use nuxl_core::identification::{
    meta, PeptideEvidence, PeptideHit, PeptideIdentification, ProteinHit, ProteinIdentification,
    TargetDecoy,
};
use nuxl_core::io::{IdentificationWriter, JsonWriter};
use std::path::PathBuf;

fn hit(sequence: &str, score: f64, decoy: bool, xl: bool, accession: &str) -> PeptideHit {
    let mut hit = PeptideHit::new(sequence, score, 1);
    hit.charge = 2;
    hit.target_decoy = Some(match decoy {
        true => TargetDecoy::Decoy,
        false => TargetDecoy::Target,
    });
    hit.evidences = vec![PeptideEvidence::new(accession, Some(1))];
    hit.set_meta(meta::IS_XL, xl as i64);
    if xl {
        hit.set_meta(meta::NA, "U");
        hit.set_meta(meta::NA_MASS, 324.0359);
        hit.set_meta(meta::BEST_LOCALIZATION_POSITION, 0i64);
    }
    hit
}

fn spectrum(scan: usize, hit: PeptideHit) -> PeptideIdentification {
    PeptideIdentification {
        identifier: "run_1".into(),
        rt: scan as f64 * 10.0,
        mz: 500.0 + scan as f64,
        spectrum_reference: format!("scan={}", scan),
        score_type: "NuXL:score".into(),
        higher_score_better: true,
        hits: vec![hit],
        meta: Default::default(),
    }
}

/// Write a fixture into a fresh directory and return (directory, identifications path)
fn fixture(name: &str) -> anyhow::Result<(PathBuf, String)> {
    let dir = std::env::temp_dir().join(format!("nuxl-cli-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir)?;

    let proteins = vec![ProteinIdentification {
        identifier: "run_1".into(),
        search_engine: "NuXL".into(),
        score_type: "NuXL:score".into(),
        higher_score_better: true,
        hits: vec![
            ProteinHit::new("P1", "MKLAAGKTR", TargetDecoy::Target),
            ProteinHit::new("P2", "MSEQNKLLR", TargetDecoy::Target),
            ProteinHit::new("P3", "MPEPTIDEK", TargetDecoy::Target),
            ProteinHit::new("DECOY_P1", "RTKGAALKM", TargetDecoy::Decoy),
        ],
        ..Default::default()
    }];
    let mut peptides = (0..6)
        .map(|scan| spectrum(scan, hit("PEPTIDEK", 50.0 - scan as f64, false, false, "P3")))
        .collect::<Vec<_>>();
    peptides.push(spectrum(6, hit("KLAAGK", 100.0, false, true, "P1")));
    peptides.push(spectrum(7, hit("GAALK", 90.0, true, true, "DECOY_P1")));
    peptides.push(spectrum(8, hit("SEQNK", 80.0, false, true, "P2")));
    peptides.push(spectrum(9, hit("KNQES", 70.0, true, true, "DECOY_P1")));

    let path = dir.join("identifications.json").to_string_lossy().to_string();
    JsonWriter.store(&path, &proteins, &peptides)?;
    Ok((dir, path))
}

fn parameters(identifications: &str, prefix: &str, extra: &str) -> anyhow::Result<Input> {
    let json = format!(
        r#"{{ "identifications": {:?}, "output_prefix": {:?}, "xl_qvalue_thresholds": [0.01, 0.05, 0.0] {} }}"#,
        identifications, prefix, extra
    );
    Ok(serde_json::from_str(&json)?)
}

#[test]
fn integration() -> anyhow::Result<()> {
    let (dir, identifications) = fixture("json")?;
    let prefix = format!("{}/out/sample_", dir.display());

    let settings = parameters(&identifications, &prefix, r#", "output_format": "json""#)?
        .build()?;
    let report = Runner::new(settings)?.run()?;

    assert_eq!(report.peptides.psms, 6);
    let thresholds = report
        .crosslinks
        .iter()
        .map(|t| t.threshold)
        .collect::<Vec<_>>();
    assert_eq!(thresholds, vec![1.0, 0.05, 0.01]);
    assert_eq!(
        report.crosslinks.iter().map(|t| t.psms).collect::<Vec<_>>(),
        vec![2, 1, 1]
    );

    let loosest = nuxl_core::read_identifications(format!("{}1.0000_XLs.json", prefix))?;
    let hits = loosest
        .peptides
        .iter()
        .flat_map(|id| id.hits.iter())
        .collect::<Vec<_>>();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| !hit.is_decoy()));
    assert!(hits.iter().all(|hit| hit.meta_double("NuXL:score_score").is_some()));

    let proteins = std::fs::read_to_string(format!("{}_proteins0.0100_XLs.tsv", prefix))?;
    let rows = proteins.lines().collect::<Vec<_>>();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("P1\t"));

    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(format!("{}results.json", prefix))?)?;
    assert_eq!(results["output_paths"].as_array().map(|p| p.len()), Some(7));
    assert_eq!(results["report_top_hits"], 1);

    Ok(())
}

#[test]
fn idxml_output() -> anyhow::Result<()> {
    let (dir, identifications) = fixture("idxml")?;
    let prefix = format!("{}/", dir.display());

    let settings = parameters(&identifications, &prefix, "")?.build()?;
    Runner::new(settings)?.run()?;

    let xml = std::fs::read_to_string(format!("{}0.0500_XLs.idXML", prefix))?;
    assert!(xml.contains("<IdXML "));
    assert!(xml.contains(r#"sequence="KLAAGK""#));
    assert!(!xml.contains("GAALK"));
    assert!(std::path::Path::new(&format!("{}0.0100_peptides.idXML", prefix)).exists());

    Ok(())
}

#[test]
fn missing_identifications_file() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("nuxl-cli-missing-{}", std::process::id()));
    let prefix = format!("{}/", dir.display());
    let missing = dir.join("does-not-exist.json").to_string_lossy().to_string();

    let settings = parameters(&missing, &prefix, "")?.build()?;
    let err = match Runner::new(settings) {
        Ok(_) => anyhow::bail!("expected a read failure"),
        Err(err) => err,
    };
    assert!(format!("{:#}", err).contains("does-not-exist.json"));
    Ok(())
}
