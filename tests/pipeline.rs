// End-to-end runs of the pipeline over a four-county fixture.

use std::{fs, path::Path};

use serde_json::Value;
use turnout::{CountyId, Pipeline, Round};

fn square(x: u32) -> String {
    let (a, b) = (x, x + 1);
    format!("[[[{a},0],[{b},0],[{b},1],[{a},1],[{a},0]]]")
}

fn feature(id: &str, name: &str, rings: &str) -> String {
    format!(r#"{{ "type": "Feature", "properties": {{ "terc_code": "{id}", "name": "{name}" }},
        "geometry": {{ "type": "Polygon", "coordinates": {rings} }} }}"#)
}

fn collection(features: &[String]) -> String {
    format!(r#"{{ "type": "FeatureCollection", "features": [{}] }}"#, features.join(","))
}

/// Four unit squares 0201..0204 side by side; the 1999 vintage merges the
/// first two into unit 0261.
fn write_fixture(dir: &Path) {
    fs::write(dir.join("counties.geojson"), collection(&[
        feature("0201", "bolesławiecki", &square(0)),
        feature("0202", "dzierżoniowski", &square(1)),
        feature("0203", "głogowski", &square(2)),
        feature("0204", "górowski", &square(3)),
    ])).unwrap();
    fs::write(dir.join("counties_1999.geojson"), collection(&[
        feature("0261", "jeleniogórski", "[[[0,0],[2,0],[2,1],[0,1],[0,0]]]"),
        feature("0203", "głogowski", &square(2)),
        feature("0204", "górowski", &square(3)),
    ])).unwrap();

    let mut salary = String::from("terc_code;year;salary\n");
    for (i, id) in ["0201", "0202", "0203"].iter().enumerate() {
        for year in 2010..=2019 {
            let value = 3000 + 400 * i as i32 + 120 * (year - 2010) + (year * 7) % 5 * 15;
            salary.push_str(&format!("{id};{year};{value},5\n"));
        }
    }
    // A single observation cannot be imputed.
    salary.push_str("0204;2014;2900\n");
    fs::write(dir.join("salary.csv"), salary).unwrap();

    let mut unemployment = String::from("code;year;unemployment\n");
    for year in 2010..=2019 {
        unemployment.push_str(&format!("02;{year};{},{}\n", 18 - (year - 2010), year % 3));
    }
    fs::write(dir.join("unemployment.csv"), unemployment).unwrap();

    fs::write(dir.join("elections_2010.csv"), "\
terc_code,authorized_voters,votes_cast,turnout
0261,20000,11001,55.0
0203,9000,4950,55.0
0204,8000,3600,45.0
").unwrap();
    fs::write(dir.join("elections_2015.csv"), "\
terc_code,authorized_voters,votes_cast
0201,10100,5858
0202,10050,4824
0203,9100,5278
0204,8100,3726
").unwrap();
    fs::write(dir.join("elections_2020.csv"), "\
terc_code,authorized_voters,votes_cast
0201,10200,6528
0202,10100,5353
0203,9200,5888
0204,8200,4182
").unwrap();

    fs::write(dir.join("config.json"), r#"{
        "counties": { "path": "counties.geojson" },
        "historical_boundaries": [ { "vintage": 1999, "path": "counties_1999.geojson" } ],
        "indicators": {
            "order": ["salary", "unemployment"],
            "sources": [
                { "path": "salary.csv", "columns": { "salary": "salary" } },
                { "path": "unemployment.csv", "columns": { "unemployment": "unemployment" },
                  "id_column": "code", "level": "voivodeship" }
            ]
        },
        "impute": { "start_year": 2005, "end_year": 2029 },
        "features": { "lag_years": 1, "delta_horizons": [1] },
        "elections": [
            { "path": "elections_2010.csv", "year": 2010, "round": 1, "vintage": 1999 },
            { "path": "elections_2015.csv", "year": 2015, "round": 1 },
            { "path": "elections_2020.csv", "year": 2020, "round": 1 }
        ],
        "model": { "holdout_year": 2020, "n_estimators": 20, "max_depth": 2,
                   "min_child_weight": 1, "subsample": 1.0 },
        "forecast": { "target_year": 2030, "round": 1 },
        "output": { "dir": "out" }
    }"#).unwrap();
}

#[test]
fn reconcile_splits_the_merged_unit_evenly() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let pipeline = Pipeline::from_path(&dir.path().join("config.json")).unwrap();

    let reconciled = pipeline.reconcile().unwrap();
    assert_eq!(reconciled.reconciliation.crosswalk(1999).unwrap().len(), 3);
    let shares = reconciled.reconciliation.resolve("0261", Some(1999)).unwrap();
    assert_eq!(shares.len(), 2);
    for share in &shares {
        assert!((share.weight - 0.5).abs() < 1e-9);
    }
    let whole = reconciled.reconciliation.resolve("0203", Some(1999)).unwrap();
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].county, CountyId::new("0203"));
    assert!((whole[0].weight - 1.0).abs() < 1e-12);
    assert!(reconciled.diagnostics.is_empty());
}

#[test]
fn build_apportions_historical_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let pipeline = Pipeline::from_path(&dir.path().join("config.json")).unwrap();
    let built = pipeline.build(pipeline.reconcile().unwrap()).unwrap();

    // 11001 ballots split in half round to 5500 on each side.
    let row = built.features.rows.iter()
        .find(|r| r.county == CountyId::new("0201") && r.year == 2010)
        .unwrap();
    assert!((row.target.unwrap() - 0.55).abs() < 1e-12);
    assert!(row.is_complete());
    // 2009 and 2008 are backcast.
    assert!(row.imputed > 0);

    // 0204 has one salary observation: unimputable, every row incomplete.
    assert!(built.diagnostics.iter().any(|d| matches!(
        d, turnout::Diagnostic::Unimputable { county, .. } if county == &CountyId::new("0204")
    )));
    assert!(built.features.rows.iter()
        .filter(|r| r.county == CountyId::new("0204"))
        .all(|r| !r.is_complete()));
    assert_eq!(built.features.training_rows().count(), 9);
    assert_eq!(built.features.forecast_rows().count(), 4);
}

#[test]
fn run_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let outcome = Pipeline::from_path(&dir.path().join("config.json")).unwrap().run().unwrap();

    let evaluation = outcome.evaluation.as_ref().unwrap();
    assert_eq!(evaluation.holdout_year, 2020);
    assert_eq!(evaluation.train_rows, 6);
    assert_eq!(evaluation.eval_rows, 3);
    assert!(evaluation.mae.unwrap() < 0.2);

    assert_eq!(outcome.forecast.round, Round::First);
    assert_eq!(outcome.forecast.predictions.len(), 3);
    assert_eq!(outcome.forecast.excluded, vec![CountyId::new("0204")]);
    assert!(outcome.forecast.predictions.values().all(|t| (0.0..=1.0).contains(t)));

    let out = dir.path().join("out");
    let manifest: Value = serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
    for name in [
        "crosswalk.csv", "imputed.csv", "features.csv", "diagnostics.json", "model.json",
        "predictions.csv", "predictions.geojson", "map.html",
    ] {
        assert!(out.join(name).is_file(), "{name} missing");
        assert_eq!(manifest["files"][name]["sha256"].as_str().unwrap().len(), 64);
    }
    assert_eq!(manifest["counts"]["unpredicted"], 1);

    let html = fs::read_to_string(out.join("map.html")).unwrap();
    assert!(html.contains("górowski (0204): no prediction"));
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let pipeline = Pipeline::from_path(&dir.path().join("config.json")).unwrap();

    let first = pipeline.build(pipeline.reconcile().unwrap()).unwrap();
    let second = pipeline.build(pipeline.reconcile().unwrap()).unwrap();
    assert_eq!(first.features, second.features);
    assert_eq!(first.imputed, second.imputed);

    let a = pipeline.train(first).unwrap();
    let b = pipeline.train(second).unwrap();
    assert_eq!(a.forecast, b.forecast);
}
