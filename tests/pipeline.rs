use std::io::{Cursor, Write};

use approx::assert_abs_diff_eq;
use geo::Area;
use serde_json::{Value, json};
use zip::{ZipWriter, write::SimpleFileOptions};

use frgeostat::config::Config;
use frgeostat::pipeline;
use frgeostat::{AggregateTable, MemSource, PipelineError, RegionKind, Statistic};

const LABELS: &str = r#"{"Code": "code", "Probability to vote": "prob_volt", "Age": "age"}"#;

const STATIONS: &str = "\
id,nom,num_dept,name_dept,bureau,prob_volt,age
1,a,75,Paris,b1,0.10,30
2,b,75,Paris,b2,0.30,40
3,c,13,Bouches-du-Rhône,b3,0.20,50
4,d,13,Bouches-du-Rhône,b4,0.40,60
5,e,29,Finistère,b5,0.05,35
";

fn square(x: f64, y: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]]],
    })
}

fn departements() -> Value {
    let dept = |code: &str, nom: &str, x: f64| json!({
        "type": "Feature",
        "properties": { "code": code, "nom": nom },
        "geometry": square(x, 45.0),
    });
    json!({
        "type": "FeatureCollection",
        "features": [
            dept("75", "Paris", 2.0),
            dept("13", "Bouches-du-Rhône", 5.0),
            dept("29", "Finistère", -4.0),
            dept("2A", "Corse-du-Sud", 8.0),
        ],
    })
}

fn communes_zip() -> Vec<u8> {
    let station = |id: u32, nom: &str, median: f64, x: f64| json!({
        "type": "Feature",
        "properties": { "id": id, "nom": nom, "name_dept": "Finistère", "prob_volt_median": median, "prob_volt_mean": median },
        "geometry": square(x, 48.0),
    });
    let collection = json!({
        "type": "FeatureCollection",
        "features": [
            station(1, "Brest", 0.2, -4.0),
            station(2, "Quimper", 0.1, 0.0),
            station(3, "Brest", 0.4, -3.0),
        ],
    });

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("commune.lvl.aggregates.metadata.geojson", SimpleFileOptions::default()).unwrap();
    zip.write_all(collection.to_string().as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

fn setup() -> (Config, MemSource) {
    let mut config = Config::bundled().unwrap();
    let dept = config.kinds.get_mut("departement").unwrap();
    dept.metadata = Some("stations.csv".into());
    dept.geometry = "departements.geojson".into();
    dept.labels = "translate.json".into();
    let commune = config.kinds.get_mut("commune").unwrap();
    commune.geometry = "communes.geojson.zip".into();
    commune.labels = "translate.json".into();

    let mut source = MemSource::default();
    source.put("stations.csv", STATIONS.as_bytes());
    source.put("departements.geojson", departements().to_string().as_bytes());
    source.put("communes.geojson.zip", &communes_zip());
    source.put("translate.json", LABELS.as_bytes());
    (config, source)
}

fn names(table: &AggregateTable, column: &str) -> Vec<String> {
    table.records().iter().map(|r| table.key_value(r, column).unwrap().to_string()).collect()
}

#[test]
fn departement_map_end_to_end() {
    let (config, source) = setup();
    let out = pipeline::run(RegionKind::Departement, &config, &source).unwrap();

    // aggregated per département, ordered by median vote probability (in percent)
    assert_eq!(names(&out.table, "name_dept"), ["Finistère", "Paris", "Bouches-du-Rhône"]);
    assert_eq!(out.table.metrics(), ["prob_volt", "age"]);
    let paris = &out.table.records()[1];
    assert_abs_diff_eq!(out.table.get(paris, "prob_volt", Statistic::median()).unwrap(), 20.0, epsilon = 1e-9);
    assert_eq!(out.table.get(&out.table.records()[0], "prob_volt", Statistic::Std), None);

    // one joined feature per matched département, Corse reported unmatched
    assert_eq!(out.joined.len(), 3);
    assert_eq!(out.joined.unmatched_features, ["Corse-du-Sud"]);
    assert!(out.joined.unmatched_rows.is_empty());

    let joined_paris = out.joined.joined.iter()
        .find(|j| j.feature.property_str("nom").as_deref() == Some("Paris"))
        .unwrap();
    let text = joined_paris.feature.property_str("prob_volt").unwrap();
    assert_eq!(text.lines().next(), Some("Median = 20.0 - IQ Interval (15.0, 25.0) - IQR 10.0"));
    assert!(joined_paris.feature.property_str("age").unwrap().contains("(μ ± σ)"));
    // reserved code keeps the geometry's own value
    assert_eq!(joined_paris.feature.property_str("code").as_deref(), Some("75"));

    let finistere = out.joined.joined.iter()
        .find(|j| j.feature.property_str("nom").as_deref() == Some("Finistère"))
        .unwrap();
    assert!(finistere.feature.property_str("prob_volt").unwrap().contains("5.0 ± 0.0 (μ ± σ)"));

    // choropleth keyed on the département code
    let values = &out.map.choropleth.values;
    assert_eq!(values.len(), 3);
    assert!(values.iter().any(|(k, v)| k == "75" && (v - 20.0).abs() < 1e-9));
    assert_eq!(out.map.tooltips.len(), 3);
    assert!(out.map.tooltips.iter().any(|t| t.popup.as_deref() == Some("https://bureaux-vote.v.olt.sh/#/map/z/dept/finistere")));

    let html = out.map.to_html().unwrap();
    assert!(html.contains("Probability to vote Volt (%)"));
    assert!(html.contains(r#"f.properties["code"]"#));
}

#[test]
fn commune_map_end_to_end() {
    let (config, source) = setup();
    let out = pipeline::run(RegionKind::Commune, &config, &source).unwrap();

    // dissolved communes: Brest (two stations) and Quimper
    let geometry = &out.map.choropleth.geometry;
    assert_eq!(geometry.len(), 2);
    assert_eq!(geometry.features[0].id, Some(json!(0)));
    assert_eq!(geometry.features[0].property_str("nom").as_deref(), Some("Brest"));
    assert_eq!(geometry.features[0].property_str("name_dept").as_deref(), Some("Finistère"));
    assert_abs_diff_eq!(geometry.features[0].geometry.unsigned_area(), 2.0, epsilon = 1e-6);

    assert_eq!(names(&out.table, "nom"), ["Quimper", "Brest"]);
    assert_eq!(names(&out.table, "id"), ["1", "0"]);
    assert_eq!(out.table.metrics(), ["prob_volt"]);

    let values = &out.map.choropleth.values;
    assert_eq!(values[0].0, "1");
    assert_abs_diff_eq!(values[0].1, 10.0, epsilon = 1e-9);
    assert_eq!(values[1].0, "0");
    assert_abs_diff_eq!(values[1].1, 30.0, epsilon = 1e-9);

    assert_eq!(out.joined.len(), 2);
    assert!(out.map.tooltips.iter().all(|t| t.popup.is_none()));
    assert!(out.map.to_html().unwrap().contains("fills[String(f.id)]"));
}

#[test]
fn outputs_are_written() {
    let (config, source) = setup();
    let out = pipeline::run(RegionKind::Departement, &config, &source).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join(RegionKind::Departement.default_map_file());
    out.map.save(&map_path).unwrap();
    assert!(std::fs::read_to_string(&map_path).unwrap().starts_with("<!DOCTYPE html>"));

    let stem = RegionKind::Departement.table_stem();
    out.table.save_tables(dir.path(), &stem).unwrap();
    assert!(dir.path().join(format!("{stem}.long.parquet")).exists());

    let reloaded = AggregateTable::load_wide(&dir.path().join(format!("{stem}.wide.parquet")), &["num_dept", "name_dept"]).unwrap();
    assert_eq!(reloaded.len(), out.table.len());
    assert_eq!(names(&reloaded, "name_dept"), names(&out.table, "name_dept"));
    for (a, b) in reloaded.records().iter().zip(out.table.records()) {
        assert_eq!(reloaded.get_column(a, "prob_volt_q90"), out.table.get_column(b, "prob_volt_q90"));
    }
}

#[test]
fn missing_provider_payload_is_fatal() {
    let (mut config, source) = setup();
    config.kinds.get_mut("departement").unwrap().labels = "missing.json".into();
    let err = pipeline::run(RegionKind::Departement, &config, &source).unwrap_err();
    assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Download { what: "labels", .. })));
}
