//! End-to-end tests: datalogger tables in, heat ratio tables out

use pretty_assertions::assert_eq;
use sapflow_ratio::encoder::HeatRatioEncoder;
use sapflow_ratio::{
    CoercionPolicy, ComputeError, HeatRatioConfig, HeatRatioProcessor, TableFormat,
};

const HEADER: &str =
    "temp1,temp2,millisSinceHeatPulse,rtcUnixTimestamp,millisSinceReferenceTemp,nodeId\n";

/// Logger rows for one pulse starting at `start`; upstream rises 2 °C, downstream `rise`
fn pulse_rows(node: u32, start: u64, rise: f64) -> String {
    let mut rows = String::new();
    rows.push_str(&format!("20.0,20.0,0,{},2000,{}\n", start, node));
    rows.push_str(&format!("20.0,20.0,0,{},7000,{}\n", start + 5, node));
    for step in 0..5u64 {
        let heat_pulse = 55_000 + step * 5_000;
        rows.push_str(&format!(
            "22.0,{},{},{},{},{}\n",
            20.0 + rise,
            heat_pulse,
            start + 10 + step * 5,
            heat_pulse + 10_000,
            node
        ));
    }
    rows
}

#[test]
fn test_csv_in_csv_out() {
    let mut input = HEADER.to_string();
    input.push_str(&pulse_rows(1, 1_700_000_000, 1.0));
    input.push_str(&pulse_rows(1, 1_700_000_600, 3.0));

    let processor = HeatRatioProcessor::default();
    let output = processor
        .process_tables(&[(TableFormat::Csv, input.as_str())])
        .unwrap();
    let csv = HeatRatioEncoder::to_csv(&output).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "nodeId,date,unixTimestamp,meanHeatRatio");
    // first row sits 2 s after the reference reading, pulse fired 10 s later
    assert_eq!(lines[1], "1,2023-11-14T22:13:08.000Z,1699999988.0,0.5");
    assert_eq!(lines[2], "1,2023-11-14T22:23:08.000Z,1700000588.0,1.5");
}

#[test]
fn test_multiple_files_are_concatenated_and_sorted() {
    // second file holds the earlier pulse; node 2 lives only in the first file
    let mut first = HEADER.to_string();
    first.push_str(&pulse_rows(1, 1_700_000_600, 3.0));
    first.push_str(&pulse_rows(2, 1_700_000_601, 1.0));
    let mut second = HEADER.to_string();
    second.push_str(&pulse_rows(1, 1_700_000_000, 1.0));

    let processor = HeatRatioProcessor::default();
    let output = processor
        .process_tables(&[
            (TableFormat::Csv, first.as_str()),
            (TableFormat::Csv, second.as_str()),
        ])
        .unwrap();

    assert_eq!(output.ids, vec!["1".to_string(), "2".to_string()]);
    let node1: Vec<Option<f64>> = output.data["1"].iter().map(|r| r.mean_heat_ratio).collect();
    assert_eq!(node1, vec![Some(0.5), Some(1.5)]);
    assert_eq!(output.data["2"][0].mean_heat_ratio, Some(0.5));
}

#[test]
fn test_config_file_window_and_inversion() {
    let config = HeatRatioConfig::from_json(
        r#"{ "heatRatioWindowStart": 60000, "heatRatioWindowEnd": 70000, "invertHeatRatios": true }"#,
    )
    .unwrap();
    let mut input = HEADER.to_string();
    input.push_str(&pulse_rows(4, 1_700_000_000, 1.0));

    let output = HeatRatioProcessor::new(config)
        .unwrap()
        .process_tables(&[(TableFormat::Csv, input.as_str())])
        .unwrap();

    assert_eq!(output.data["4"][0].mean_heat_ratio, Some(2.0));
}

#[test]
fn test_hot_downstream_row_depends_on_filter_mode() {
    let mut input = HEADER.to_string();
    input.push_str(&pulse_rows(1, 1_700_000_000, 1.0));
    // an implausible downstream spike inside the window
    input.push_str("22.0,100.0,62000,1700000017,72000,1\n");

    let legacy = HeatRatioProcessor::default()
        .process_tables(&[(TableFormat::Csv, input.as_str())])
        .unwrap();
    let legacy_ratio = legacy.data["1"][0].mean_heat_ratio.unwrap();
    assert!(legacy_ratio > 0.5);

    let mut config = HeatRatioConfig::default();
    config.downstream_temp_limit = Some(40.0);
    let bounded = HeatRatioProcessor::new(config)
        .unwrap()
        .process_tables(&[(TableFormat::Csv, input.as_str())])
        .unwrap();
    assert_eq!(bounded.data["1"][0].mean_heat_ratio, Some(0.5));
}

#[test]
fn test_strict_and_lenient_coercion() {
    let mut input = HEADER.to_string();
    input.push_str(&pulse_rows(1, 1_700_000_000, 1.0));
    input.push_str("n/a,20.0,0,1700000100,1000,1\n");

    let strict =
        HeatRatioProcessor::default().process_tables(&[(TableFormat::Csv, input.as_str())]);
    assert!(matches!(strict, Err(ComputeError::NonNumericField { .. })));

    let mut config = HeatRatioConfig::default();
    config.coercion = CoercionPolicy::Lenient;
    let processor = HeatRatioProcessor::new(config).unwrap();
    let report = processor
        .ingest(&[(TableFormat::Csv, input.as_str())])
        .unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.readings.len(), 7);
}

#[test]
fn test_empty_table_gives_empty_output() {
    let output = HeatRatioProcessor::default()
        .process_tables(&[(TableFormat::Csv, HEADER)])
        .unwrap();
    assert!(output.is_empty());
    assert_eq!(
        HeatRatioEncoder::to_json(&output).unwrap(),
        r#"{"ids":[],"data":{}}"#
    );
}

#[test]
fn test_adjacent_and_zero_padded_node_ids_are_separate_nodes() {
    let mut input = HEADER.to_string();
    for (offset, node) in ["9007199254740993", "9007199254740992", "007", "7"]
        .iter()
        .enumerate()
    {
        input.push_str(&format!("20.0,20.0,0,{},2000,{}\n", 1_700_000_000 + offset, node));
    }

    let output = HeatRatioProcessor::default()
        .process_tables(&[(TableFormat::Csv, input.as_str())])
        .unwrap();

    assert_eq!(
        output.ids,
        vec![
            "9007199254740993".to_string(),
            "9007199254740992".to_string(),
            "007".to_string(),
            "7".to_string(),
        ]
    );
    assert!(output.data.values().all(|records| records.len() == 1));
}
