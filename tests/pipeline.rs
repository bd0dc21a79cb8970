use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use housing_insights::{Pipeline, PipelineConfig, PipelineError, PipelinePaths};

const HEADER: &str = "Suburb,Address,Rooms,Type,Price,Method,Date,Distance,Postcode,Bedroom2,\
                      Car,Landsize,BuildingArea,CouncilArea";

fn raw_csv() -> String {
    let rows = [
        "Reservoir,1 High St,3,h,705000,S,3/4/2016,11.2,3073,3,1,500,,Darebin City Council",
        "reservoir ,2 High St,3,h,690000,S,4/4/2016,11.2,3073,3,,520,110,Darebin City Council",
        "RESERVOIR,3 High St,2,u,480000,PI,5/8/2017,11.2,3073,2,1,120,70,Darebin City Council",
        "Reservoir,4 High St,4,h,820000,S,6/8/2017,11.2,3073,4,2,600,150,Darebin City Council",
        "Northcote,1 Main Rd,3,h,1300000,S,3/4/2016,5.5,3070,3,1,350,140,Darebin City Council",
        "Northcote,2 Main Rd,2,u,650000,S,9/9/2017,5.5,3070,2,1,80,65,Darebin City Council",
        "Northcote,3 Main Rd,4,h,1700000,VB,2/7/2017,5.5,3070,4,2,420,200,Darebin City Council",
        "Coburg,1 Bell St,3,h,1000000,S,12/5/2016,7.8,3058,3,1,450,130,Moreland City Council",
        "Coburg,2 Bell St,3,h,980000,S,13/5/2016,7.8,3058,3,1,0,120,Moreland City Council",
        "Kew,1 High St,4,h,2600000,S,1/6/2016,5.6,3101,4,2,60000,300,Boroondara City Council",
        "Kew,2 High St,3,h,not-a-price,S,1/6/2016,5.6,3101,3,2,700,200,Boroondara City Council",
        "Saint Kilda,1 Beach Rd,2,u,600000,S,7/7/2017,6.1,3182,2,1,90,75,Port Phillip City Council",
    ];
    let mut out = String::from(HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out
}

fn setup(dir: &Path) -> PipelinePaths {
    let paths = PipelinePaths::under(dir);
    fs::create_dir_all(paths.raw.parent().unwrap()).unwrap();
    fs::write(&paths.raw, raw_csv()).unwrap();
    paths
}

fn suburbs_in(path: &Path) -> BTreeSet<String> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.records().map(|r| r.unwrap()[0].to_string()).collect()
}

#[test]
fn test_full_run_produces_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let paths = setup(dir.path());
    let summary = Pipeline::default().run(&paths).unwrap();

    assert_eq!(summary.cleaning.initial_rows, 12);
    assert_eq!(summary.cleaning.malformed_rows, 1);
    assert_eq!(summary.cleaning.removed_invalid_landsize, 2);
    assert_eq!(summary.cleaning.final_rows, 9);
    assert!(summary.cleaning.final_rows <= summary.cleaning.initial_rows);
    assert_eq!(summary.report_files.len(), 6);

    let cleaned = fs::read_to_string(&paths.cleaned).unwrap();
    assert!(cleaned.starts_with(HEADER));
    // Unmodeled columns pass through; missing car spaces become 0; missing
    // building area stays empty.
    assert!(cleaned.contains(
        "Reservoir,2 High St,3,h,690000,S,4/4/2016,11.2,3073,3,0,520,110,Darebin City Council"
    ));
    assert!(cleaned.contains(
        "Reservoir,1 High St,3,h,705000,S,3/4/2016,11.2,3073,3,1,500,,Darebin City Council"
    ));
    assert!(cleaned.contains("St Kilda,1 Beach Rd"));

    let mut rdr = csv::Reader::from_path(&paths.cleaned).unwrap();
    let landsize_idx = rdr
        .headers()
        .unwrap()
        .iter()
        .position(|h| h == "Landsize")
        .unwrap();
    for record in rdr.records() {
        let landsize: f64 = record.unwrap()[landsize_idx].parse().unwrap();
        assert!(landsize > 0.0 && landsize <= 50_000.0);
    }

    let gaps = fs::read_to_string(paths.reports.join("value_gaps.csv")).unwrap();
    assert!(gaps.contains("Reservoir,Northcote,"));
}

#[test]
fn test_analysis_contains_exactly_top_n_suburbs() {
    let dir = tempfile::tempdir().unwrap();
    let paths = setup(dir.path());
    let config = PipelineConfig {
        top_n: 2,
        ..PipelineConfig::default()
    };
    Pipeline::new(config).run(&paths).unwrap();

    let expected: BTreeSet<String> = ["Northcote", "Reservoir"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(suburbs_in(&paths.analysis), expected);
}

#[test]
fn test_rerun_is_byte_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = setup(first.path());
    let b = setup(second.path());
    Pipeline::default().run(&a).unwrap();
    Pipeline::default().run(&b).unwrap();

    assert_eq!(fs::read(&a.cleaned).unwrap(), fs::read(&b.cleaned).unwrap());
    assert_eq!(fs::read(&a.analysis).unwrap(), fs::read(&b.analysis).unwrap());
    for file in [
        "suburb_summary.csv",
        "value_gaps.csv",
        "property_type_premium.csv",
        "bedroom_premium.csv",
        "quarterly_trends.csv",
        "headline.csv",
    ] {
        assert_eq!(
            fs::read(a.reports.join(file)).unwrap(),
            fs::read(b.reports.join(file)).unwrap(),
            "{file} differs between runs"
        );
    }
}

#[test]
fn test_missing_column_aborts_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let paths = PipelinePaths::under(dir.path());
    fs::create_dir_all(paths.raw.parent().unwrap()).unwrap();
    fs::write(
        &paths.raw,
        "Suburb,Rooms,Type,Price,Date,Car,BuildingArea\nKew,3,h,1,1/1/2016,1,\n",
    )
    .unwrap();

    let err = Pipeline::default().clean(&paths.raw, &paths.cleaned).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "Landsize"));
    assert!(!paths.cleaned.exists());
}

#[test]
fn test_record_without_building_area_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let paths = setup(dir.path());
    let summary = Pipeline::default().run(&paths).unwrap();

    let reservoir = summary
        .report
        .suburbs
        .iter()
        .find(|s| s.suburb == "Reservoir")
        .unwrap();
    assert_eq!(reservoir.transaction_count, 4);
    // 110, 70 and 150; the sale without a building area is not counted.
    assert_eq!(reservoir.median_building_area, Some(110.0));
}
