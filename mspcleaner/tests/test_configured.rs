use std::fs;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_configured() {
    let dir = tempfile::tempdir().unwrap();
    let summary_path = dir.path().join("summary.json");

    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("tests/data/configured.toml"));
    config = config.merge(Serialized::default("output_dir", dir.path()));
    config = config.merge(Serialized::default("summary_file", &summary_path));
    let driver: mspcleaner::MspCleaner = config.extract().unwrap();

    assert_eq!(driver.chunk_size, 2);
    assert_eq!(driver.filters.max_peaks, Some(2));
    assert_eq!(driver.filters.min_peaks, 3);
    assert!(driver.normalizer.require_identity_fields);

    driver.main().unwrap();

    let cleaned = fs::read_to_string(dir.path().join("small_cleaned.msp")).unwrap();
    let counts: Vec<usize> = cleaned
        .lines()
        .filter_map(|l| l.strip_prefix("NUM PEAKS: "))
        .map(|n| n.parse().unwrap())
        .collect();
    assert_eq!(counts, vec![2, 2, 2, 1]);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(summary["cleaning"]["spectra_accepted"], 4);
    assert_eq!(summary["cleaning"]["minimum_peaks_not_met"], 4);
}
