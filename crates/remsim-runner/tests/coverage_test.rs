//! End-to-end map build through the public runner API.

use remsim_runner::{load_scenario, run_scenario};
use std::path::Path;

/// Deterministic scenario: one transmitter at the origin, a loss-only
/// channel (no shadowing, no fading), odd grid so the center point sits
/// directly under the transmitter.
const SCENARIO: &str = r#"
rem:
  mode: beam-shape
  x_min: -100
  x_max: 100
  x_res: 5
  y_min: -100
  y_max: 100
  y_res: 5
  z: 1.5
  iterations: 1
  sim_tag: e2e
channel:
  propagation: free-space
  shadowing_sigma_db: 0.0
  fading_sigma_db: 0.0
transmitters:
  - name: gnb-0
    position: { x: 0, y: 0, z: 10 }
    tx_power_dbm: 40
    antenna:
      rows: 1
      columns: 1
      element_gain_db: 0
      omni: true
    bandwidth_parts:
      - center_frequency_hz: 3.5e9
        bandwidth_hz: 20e6
        numerology: 1
receiver:
  position: { x: 0, y: 0, z: 1.5 }
  noise_figure_db: 5.0
  antenna:
    rows: 1
    columns: 1
    element_gain_db: 0
    omni: true
  bandwidth_parts:
    - center_frequency_hz: 3.5e9
      bandwidth_hz: 20e6
      numerology: 1
"#;

struct MapRecord {
    x: f64,
    y: f64,
    snr_db: f64,
    sinr_db: f64,
}

fn read_map(path: &Path) -> Vec<MapRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let fields: Vec<f64> = line
                .split_whitespace()
                .map(|field| field.parse().unwrap())
                .collect();
            assert_eq!(fields.len(), 5, "malformed record: {}", line);
            MapRecord {
                x: fields[0],
                y: fields[1],
                snr_db: fields[3],
                sinr_db: fields[4],
            }
        })
        .collect()
}

#[test]
fn test_free_space_coverage_map() {
    let dir = tempfile::tempdir().unwrap();
    let scenario_path = dir.path().join("scenario.yaml");
    std::fs::write(&scenario_path, SCENARIO).unwrap();

    let scenario = load_scenario(&scenario_path).unwrap();
    let stats = run_scenario(scenario, 7, dir.path()).unwrap();
    assert_eq!(stats.report.num_points, 25);
    assert_eq!(stats.report.num_transmitters, 1);

    let records = read_map(&dir.path().join("rem-e2e.out"));
    assert_eq!(records.len(), 25);

    // All values finite; single transmitter means SNR equals SINR.
    for record in &records {
        assert!(record.snr_db.is_finite());
        assert!(record.sinr_db.is_finite());
        assert!((record.snr_db - record.sinr_db).abs() < 1e-9);
    }

    // Free-space loss grows with distance, so the point under the
    // transmitter is the unique maximum.
    let center = records
        .iter()
        .find(|r| r.x == 0.0 && r.y == 0.0)
        .expect("center point missing");
    for record in &records {
        if record.x != 0.0 || record.y != 0.0 {
            assert!(
                record.snr_db < center.snr_db,
                "({}, {}) not below center",
                record.x,
                record.y
            );
        }
    }

    // SNR falls monotonically along the +x row through the transmitter.
    let mut row: Vec<&MapRecord> = records.iter().filter(|r| r.y == 0.0 && r.x >= 0.0).collect();
    row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
    for pair in row.windows(2) {
        assert!(pair[0].snr_db > pair[1].snr_db);
    }

    // Companion outputs.
    for name in ["gnbs-e2e.txt", "ues-e2e.txt", "buildings-e2e.txt", "rem-plot-e2e.gnuplot"] {
        assert!(dir.path().join(name).exists(), "missing {}", name);
    }
}

#[test]
fn test_interference_lowers_sinr() {
    let two_cells = SCENARIO.replace(
        "transmitters:\n  - name: gnb-0",
        "transmitters:\n  - name: gnb-1\n    position: { x: 100, y: 100, z: 10 }\n    \
         tx_power_dbm: 40\n    antenna:\n      rows: 1\n      columns: 1\n      \
         element_gain_db: 0\n      omni: true\n    bandwidth_parts:\n      - center_frequency_hz: 3.5e9\n        \
         bandwidth_hz: 20e6\n        numerology: 1\n  - name: gnb-0",
    );
    let dir = tempfile::tempdir().unwrap();
    let scenario_path = dir.path().join("scenario.yaml");
    std::fs::write(&scenario_path, two_cells).unwrap();

    let scenario = load_scenario(&scenario_path).unwrap();
    let stats = run_scenario(scenario, 7, dir.path()).unwrap();
    assert_eq!(stats.report.num_transmitters, 2);

    let records = read_map(&dir.path().join("rem-e2e.out"));
    for record in &records {
        assert!(record.sinr_db < record.snr_db, "no interference at ({}, {})", record.x, record.y);
        assert!(record.sinr_db.is_finite());
    }
}

#[test]
fn test_same_seed_same_map() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let shadowed = SCENARIO
        .replace("propagation: free-space", "propagation: three-gpp-uma")
        .replace("shadowing_sigma_db: 0.0", "shadowing_sigma_db: 6.0")
        .replace("iterations: 1", "iterations: 4");

    let run = |dir: &Path| {
        let path = dir.join("scenario.yaml");
        std::fs::write(&path, &shadowed).unwrap();
        run_scenario(load_scenario(&path).unwrap(), 99, dir).unwrap();
        std::fs::read_to_string(dir.join("rem-e2e.out")).unwrap()
    };
    assert_eq!(run(dir_a.path()), run(dir_b.path()));
}
