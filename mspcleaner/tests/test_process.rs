use std::{error::Error, fs, io::Read, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn count_entries(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with("NAME: ")).count()
}

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("mspcleaner")?;

    cmd.arg("not_real.msp").arg("-o").arg(dir.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open input file not_real.msp"));
    Ok(())
}

#[test]
fn test_invalid_chunk_size() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mspcleaner")?;

    cmd.arg("tests/data/small.msp").args(["-c", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than zero"));
    Ok(())
}

#[test]
fn test_run_small() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let summary_path = dir.path().join("summary.json");

    let mut cmd = Command::cargo_bin("mspcleaner")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/small.msp")
        .arg("-o")
        .arg(dir.path())
        .arg("--summary-file")
        .arg(&summary_path)
        .args(["-t", "2", "-c", "3"]);
    let result = cmd.assert().success();
    result
        .stderr(predicate::str::contains("Spectra read: 7"))
        .stderr(predicate::str::contains("Spectra accepted: 4"))
        .stderr(predicate::str::contains("No peaks list: 1"))
        .stderr(predicate::str::contains("No or bad precursor m/z: 1"))
        .stderr(predicate::str::contains("No identity fields: 1"))
        .stderr(predicate::str::contains("Minimum peaks not met: 0"));

    let cleaned = fs::read_to_string(dir.path().join("small_cleaned.msp"))?;
    assert_eq!(count_entries(&cleaned), 4);
    assert!(cleaned.contains(
        "NUM PEAKS: 3\n110.07130000 12.50000000\n138.06620000 100.00000000\n195.08770000 42.00000000\n\n"
    ));
    assert!(cleaned.contains("PRECURSORMZ: 191.0197\nIONMODE: negative\n"));
    assert!(!cleaned.contains("Garbled"));

    let expected = [("POS_LC", 1), ("POS_GC", 1), ("NEG_LC", 1), ("NEG_GC", 0)];
    for (label, n) in expected {
        let text = fs::read_to_string(dir.path().join(format!("small_{label}.msp")))?;
        assert_eq!(count_entries(&text), n, "{label}");
    }
    let pos_gc = fs::read_to_string(dir.path().join("small_POS_GC.msp"))?;
    assert!(pos_gc.contains("NAME: Toluene\n"));

    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(summary_path)?)?;
    assert_eq!(summary["read"]["entries_read"], 7);
    assert_eq!(summary["read"]["malformed_entries"], 1);
    assert_eq!(summary["cleaning"]["spectra_accepted"], 4);
    assert_eq!(summary["unclassified_polarity"], 1);
    assert_eq!(summary["outputs"].as_array().map(|a| a.len()), Some(5));
    Ok(())
}

#[test]
fn test_run_stdin_gzip_no_split() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input = fs::read("tests/data/small.msp")?;

    let mut cmd = assert_cmd::Command::cargo_bin("mspcleaner")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("-")
        .arg("-o")
        .arg(dir.path())
        .args(["-z", "--no-split"])
        .write_stdin(input);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Spectra accepted: 4"));

    let path = dir.path().join("stdin_cleaned.msp.gz");
    assert!(path.exists());
    assert!(!dir.path().join("stdin_POS_LC.msp.gz").exists());

    let bytes = fs::read(path)?;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    Ok(())
}

#[test]
fn test_corrupt_input_finishes_output() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("corrupt.msp.gz");
    fs::write(&input, [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff])?;
    let out_dir = dir.path().join("out");

    let mut cmd = Command::cargo_bin("mspcleaner")?;
    cmd.arg(&input).arg("-o").arg(&out_dir).arg("-z");
    cmd.assert().failure();

    let bytes = fs::read(out_dir.join("corrupt_cleaned.msp.gz"))?;
    let mut text = String::new();
    flate2::read::GzDecoder::new(bytes.as_slice()).read_to_string(&mut text)?;
    assert!(text.is_empty());
    assert!(!out_dir.join("corrupt_POS_LC.msp.gz").exists());
    Ok(())
}
