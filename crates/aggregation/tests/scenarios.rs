//! End-to-end aggregation of gridded and band-stack inputs.

mod common;

use std::path::PathBuf;

use aggregation::{
    AggregationError, AggregationTask, Aggregator, EngineState, ExecutionOutcome, OpenMode,
};
use common::MeanEngine;
use test_utils::{
    create_axis, create_constant_grid, create_pm25_grid, read_output_rows, BandStackFixture,
    GriddedFixture,
};
use zonal_stats::{Geography, RasterizationStrategy};

#[test]
fn gridded_downscaled_county_with_year_and_month() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pm25_201812_201812.nc");
    GriddedFixture::new(create_axis(-120.0, 0.5, 6), create_axis(34.0, 0.5, 4))
        .variable("PM25", create_pm25_grid(6, 4))
        .write(&input)
        .unwrap();

    let engine = MeanEngine::new(&["06037", "06001"]);
    let task = AggregationTask::new(
        &input,
        vec!["pm25".to_string()],
        dir.path().join("pm25_county.csv.gz"),
        dir.path().join("county.shp"),
        Geography::County,
    )
    .with_strategy(RasterizationStrategy::Downscale)
    .with_extra_column("Year", "2018")
    .with_extra_column("Month", "12");

    let mut aggregator = Aggregator::new(task, &engine);
    let outcome = aggregator.execute(OpenMode::Truncate).unwrap();
    assert_eq!(aggregator.state(), EngineState::Done);
    assert_eq!(aggregator.variables().unwrap(), ["PM25".to_string()]);

    let rows = read_output_rows(outcome.output());
    assert_eq!(rows[0], vec!["PM25", "county", "Year", "Month"]);
    assert_eq!(rows.len(), 3);
    for row in &rows[1..] {
        assert_eq!(row.len(), 4);
        assert!(row[0].parse::<f64>().unwrap().is_finite());
        assert_eq!(row[1].len(), 5);
        assert_eq!(&row[2..], ["2018", "12"]);
    }

    let calls = engine.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].multi);
    assert_eq!(calls[0].transform_scale, 5);
    assert_eq!(calls[0].layer_scales, vec![5]);
    assert_eq!(calls[0].layer_shapes, vec![(30, 20)]);
}

#[test]
fn band_stack_two_variables_per_zip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("no2_o3.tif");
    BandStackFixture::new(5, 4, (-75.0, 42.0), (0.25, 0.25))
        .band("no2", create_constant_grid(5, 4, 12.5))
        .band("o3", create_constant_grid(5, 4, 31.0))
        .write(&input)
        .unwrap();

    let zips = ["02138", "02139", "02140"];
    let engine = MeanEngine::new(&zips);
    let task = AggregationTask::new(
        &input,
        vec!["no2".to_string(), "o3".to_string()],
        dir.path().join("no2_o3_zip.csv"),
        dir.path().join("zip.shp"),
        Geography::Zip,
    );

    let mut aggregator = Aggregator::new(task, &engine);
    let outcome = aggregator.execute(OpenMode::Truncate).unwrap();
    assert_eq!(outcome.rows(), zips.len());

    let rows = read_output_rows(outcome.output());
    assert_eq!(rows[0], vec!["no2", "o3", "zip"]);
    assert_eq!(rows.len(), zips.len() + 1);
    for (row, zip) in rows[1..].iter().zip(zips) {
        assert_eq!(row, &vec!["12.5".to_string(), "31".to_string(), zip.to_string()]);
    }

    let calls = engine.calls.borrow();
    assert!(calls[0].multi);
    assert_eq!(calls[0].transform_scale, 1);
    assert_eq!(calls[0].layer_scales, vec![1, 1]);
}

#[test]
fn unknown_variable_lists_available_names() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pm25.nc");
    GriddedFixture::new(create_axis(-120.0, 0.5, 3), create_axis(34.0, 0.5, 3))
        .variable("PM25", create_pm25_grid(3, 3))
        .write(&input)
        .unwrap();

    let engine = MeanEngine::new(&["06037"]);
    let task = AggregationTask::new(
        &input,
        vec!["co".to_string()],
        dir.path().join("co_county.csv"),
        dir.path().join("county.shp"),
        Geography::County,
    );

    let err = Aggregator::new(task, &engine)
        .execute(OpenMode::Truncate)
        .unwrap_err();
    assert!(matches!(err, AggregationError::Resolution { .. }));

    let message = err.to_string();
    assert!(message.contains("PM25"), "{}", message);
    assert!(message.contains("co"), "{}", message);
    let available = message.split("Available variables:").nth(1).unwrap();
    assert!(!available.contains("lat"), "{}", message);
    assert!(!available.contains("lon"), "{}", message);
    assert!(engine.calls.borrow().is_empty());
}

#[test]
fn missing_input_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing_zip.csv");
    let engine = MeanEngine::new(&["02138"]);
    let task = AggregationTask::new(
        dir.path().join("missing.nc"),
        vec!["tmmx".to_string()],
        &output,
        dir.path().join("zip.shp"),
        Geography::Zip,
    )
    .with_extra_column("Year", "2020");

    let outcome = Aggregator::new(task, &engine)
        .execute(OpenMode::Truncate)
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::HeaderOnly { output: output.clone() });
    assert_eq!(read_output_rows(&output), vec![vec!["tmmx", "zip", "Year"]]);
    assert!(engine.calls.borrow().is_empty());
}

#[test]
fn column_count_is_fixed_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("climate.nc");
    GriddedFixture::new(create_axis(-110.0, 1.0, 3), create_axis(40.0, -1.0, 3))
        .variable("tmmx", create_pm25_grid(3, 3))
        .variable("tmmn", create_pm25_grid(3, 3))
        .variable("pr", create_pm25_grid(3, 3))
        .write(&input)
        .unwrap();

    let engine = MeanEngine::new(&["a", "b"]);
    for (variables, extras) in [(vec!["tmmx"], 0), (vec!["tmmx", "pr"], 1), (vec!["pr", "tmmn", "tmmx"], 2)] {
        let output: PathBuf = dir.path().join(format!("out_{}.csv", variables.len()));
        let mut task = AggregationTask::new(
            &input,
            variables.iter().map(|s| s.to_string()).collect(),
            &output,
            dir.path().join("custom.shp"),
            Geography::Custom,
        );
        for i in 0..extras {
            task = task.with_extra_column(format!("Extra{}", i), "x");
        }

        Aggregator::new(task, &engine)
            .execute(OpenMode::Truncate)
            .unwrap();

        let rows = read_output_rows(&output);
        let expected = variables.len() + 1 + extras;
        assert!(rows.iter().all(|r| r.len() == expected));
        assert_eq!(&rows[0][..variables.len()], variables.as_slice());
        assert_eq!(rows[0][variables.len()], "custom");
    }
}
