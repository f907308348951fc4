//! Sequential execution of several tasks.

mod common;

use aggregation::{batch_tasks, AggregationTask, ExecutionOutcome, Pipeline, RunConfig};
use common::MeanEngine;
use test_utils::{create_axis, create_pm25_grid, read_output_rows, GriddedFixture};
use zonal_stats::Geography;

fn write_year(dir: &std::path::Path, variable: &str, year: u16) {
    GriddedFixture::new(create_axis(-120.0, 0.5, 3), create_axis(34.0, 0.5, 2))
        .variable(variable, create_pm25_grid(3, 2))
        .write(dir.join(format!("{}_{}.nc", variable, year)))
        .unwrap();
}

#[test]
fn batch_runs_every_year_and_variable() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();
    write_year(&raw, "tmmx", 2019);
    write_year(&raw, "pr", 2019);
    // pr for 2020 is absent on purpose
    write_year(&raw, "tmmx", 2020);

    let config = RunConfig {
        destination: dir.path().join("out"),
        shape_files: vec![dir.path().join("zip.shp")],
        geography: Geography::Zip,
        variables: vec!["tmmx".to_string(), "pr".to_string()],
        years: vec![2019, 2020],
        input_template: Some(format!("{}/{{variable}}_{{year}}.nc", raw.display())),
        ..RunConfig::default()
    };

    let engine = MeanEngine::new(&["02138", "02139"]);
    let report = Pipeline::new(&engine)
        .with_tasks(batch_tasks(&config).unwrap())
        .execute_sequentially()
        .unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.profile.tasks, 3);
    assert_eq!(engine.calls.borrow().len(), 3);

    let rows = read_output_rows(dir.path().join("out").join("tmmx_2020_zip.csv"));
    assert_eq!(rows[0], vec!["tmmx", "zip", "Year"]);
    assert_eq!(rows.len(), 3);
    assert!(rows[1..].iter().all(|r| r[2] == "2020"));

    let missing = read_output_rows(dir.path().join("out").join("pr_2020_zip.csv"));
    assert_eq!(missing, vec![vec!["pr", "zip", "Year"]]);
}

#[test]
fn tasks_sharing_an_output_append_after_the_first() {
    let dir = tempfile::tempdir().unwrap();
    write_year(dir.path(), "pm25", 2018);
    write_year(dir.path(), "pm25", 2019);
    let output = dir.path().join("pm25_county.csv");

    let task = |year: u16| {
        AggregationTask::new(
            dir.path().join(format!("pm25_{}.nc", year)),
            vec!["PM25".to_string()],
            &output,
            dir.path().join("county.shp"),
            Geography::County,
        )
        .with_extra_column("Year", year.to_string())
    };

    let engine = MeanEngine::new(&["06037"]);
    Pipeline::new(&engine)
        .with_tasks(vec![task(2018), task(2019)])
        .execute_sequentially()
        .unwrap();

    let rows = read_output_rows(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["pm25", "county", "Year"]);
    assert_eq!(rows[1][2], "2018");
    assert_eq!(rows[2][2], "2019");
}

#[test]
fn resume_appends_to_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    write_year(dir.path(), "pm25", 2018);
    let output = dir.path().join("pm25_county.csv");
    std::fs::write(&output, "pm25,county\n1.0,06001\n").unwrap();

    let engine = MeanEngine::new(&["06037"]);
    let mut pipeline = Pipeline::new(&engine).resume(true);
    pipeline.add_task(AggregationTask::new(
        dir.path().join("pm25_2018.nc"),
        vec!["pm25".to_string()],
        &output,
        dir.path().join("county.shp"),
        Geography::County,
    ));
    pipeline.execute_sequentially().unwrap();

    let rows = read_output_rows(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2][1], "06037");
}

#[test]
fn missing_input_keeps_rows_of_earlier_tasks() {
    let dir = tempfile::tempdir().unwrap();
    write_year(dir.path(), "pm25", 2018);
    // No 2019 input
    let output = dir.path().join("pm25_county.csv");

    let task = |year: u16| {
        AggregationTask::new(
            dir.path().join(format!("pm25_{}.nc", year)),
            vec!["pm25".to_string()],
            &output,
            dir.path().join("county.shp"),
            Geography::County,
        )
        .with_extra_column("Year", year.to_string())
    };

    let engine = MeanEngine::new(&["06037"]);
    let report = Pipeline::new(&engine)
        .with_tasks(vec![task(2018), task(2019)])
        .execute_sequentially()
        .unwrap();

    assert_eq!(
        report.outcomes[1],
        ExecutionOutcome::Skipped { output: output.clone() }
    );
    let rows = read_output_rows(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["pm25", "county", "Year"]);
    assert_eq!(rows[1][1..], ["06037", "2018"]);
}

#[test]
fn resume_with_missing_input_leaves_output_alone() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("pm25_county.csv");
    std::fs::write(&output, "pm25,county\n1.0,06001\n").unwrap();

    let engine = MeanEngine::new(&["06037"]);
    let report = Pipeline::new(&engine)
        .resume(true)
        .with_tasks(vec![AggregationTask::new(
            dir.path().join("pm25_2019.nc"),
            vec!["pm25".to_string()],
            &output,
            dir.path().join("county.shp"),
            Geography::County,
        )])
        .execute_sequentially()
        .unwrap();

    assert_eq!(report.outcomes[0].rows(), 0);
    assert!(engine.calls.borrow().is_empty());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "pm25,county\n1.0,06001\n"
    );
}
