//! Variability mode runs over synthetic observation and model trees.

use diagnostics::InterpolationRegridder;
use pmp_common::{Field, GridSpec, TargetGrid};
use pmp_io::ObsCatalog;
use pmp_metrics::results::{self, DEFAULT_REFERENCE_KEY};
use pmp_metrics::{model_descriptor, LandSeaMaskGenerator, ModePipeline, Parameter, ResultsSummary};
use test_utils::{fixtures, generators, DatasetTree};

const START_YEAR: i32 = 1950;
const MONTHS: usize = 120;

/// All-ocean land fraction on any grid.
struct AllOcean;

impl LandSeaMaskGenerator for AllOcean {
    fn generate(&self, grid: &GridSpec) -> pmp_metrics::Result<Field> {
        Ok(Field::fixed("sftlf", grid.lats(), grid.lons(), vec![0.0; grid.len()])?)
    }
}

/// Reference land fraction that cannot be read.
struct Unreadable;

impl LandSeaMaskGenerator for Unreadable {
    fn generate(&self, _grid: &GridSpec) -> pmp_metrics::Result<Field> {
        Err(pmp_metrics::MetricsError::config("reference land fraction unreadable"))
    }
}

fn pacific_grid() -> GridSpec {
    GridSpec::uniform(22.5, 8, 5.0, 115.0, 12, 10.0)
}

fn pdo_like(grid: &GridSpec) -> Field {
    generators::standing_mode("ts", &grid.lats(), &grid.lons(), START_YEAR, MONTHS, |j, i| {
        1.0 + (j + i) as f32 * 0.1
    })
}

/// Tree with HadISST, two of three models and one model land fraction.
fn populated_tree() -> DatasetTree {
    let grid = pacific_grid();
    let mut tree = DatasetTree::new();
    tree.add("obs/ocn/mo/ts/HadISST/ac/sst.nc", pdo_like(&grid));
    tree.add(
        "models/ts_Amon_ACCESS1-0_historical_r1i1p1_195001-195912.nc",
        pdo_like(&grid),
    );
    tree.add(
        "models/ts_Amon_CanESM2_historical_r1i1p1_195001-195912.nc",
        pdo_like(&grid),
    );
    tree.add(
        "models/sftlf_fx_ACCESS1-0_r0i0p0.nc",
        generators::coastline_sftlf(&grid.lats(), &grid.lons(), 130.0),
    );
    tree
}

fn parameter(tree: &DatasetTree) -> Parameter {
    let mut p = Parameter::new(tree.path("obs"), tree.path("models"), fixtures::MODEL_TEMPLATE);
    p.sftlf_filename_template = Some(fixtures::SFTLF_TEMPLATE.to_string());
    p.model_versions = fixtures::MODEL_VERSIONS.iter().map(|s| s.to_string()).collect();
    p.period = Some("195001-195912".to_string());
    p.target_grid = TargetGrid::Spec(pacific_grid());
    p.start_year = START_YEAR;
    p.end_year = 1959;
    p.results_dir = tree.path("results");
    p
}

fn run(tree: &DatasetTree, p: &Parameter, catalog: &ObsCatalog) -> pmp_metrics::Result<ResultsSummary> {
    let generator: &dyn LandSeaMaskGenerator = &AllOcean;
    ModePipeline::new(p, catalog, tree.reader(), &InterpolationRegridder, Some(generator))?.run()
}

#[test]
fn test_model_path_follows_template() {
    let tree = populated_tree();
    let p = parameter(&tree);
    let descriptor = model_descriptor(&p, "CanESM2", "ts").unwrap();
    assert_eq!(
        descriptor.materialize().unwrap(),
        tree.path("models/ts_Amon_CanESM2_historical_r1i1p1_195001-195912.nc")
    );
}

#[test]
fn test_run_compares_every_available_model() {
    let tree = populated_tree();
    let p = parameter(&tree);
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let summary = run(&tree, &p, &catalog).unwrap();

    // GFDL-CM3 has no data and is skipped.
    assert_eq!(summary.models().collect::<Vec<_>>(), vec!["ACCESS1-0", "CanESM2"]);
    for model in ["ACCESS1-0", "CanESM2"] {
        let stats = summary.get(model, "default", "pdo").unwrap();
        assert!(stats.cor > 0.999, "{model}: cor {}", stats.cor);
        assert!(stats.rms < 1e-3, "{model}: rms {}", stats.rms);
        assert!(stats.frac > 0.0 && stats.frac <= 1.0);
    }
    assert!(summary.results["CanESM2"].contains_key(DEFAULT_REFERENCE_KEY));
}

#[test]
fn test_run_without_mask_source() {
    let tree = populated_tree();
    let p = parameter(&tree);
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let mut pipeline = ModePipeline::new(&p, &catalog, tree.reader(), &InterpolationRegridder, None).unwrap();
    let summary = pipeline.run().unwrap();
    assert_eq!(summary.models().count(), 2);
}

#[test]
fn test_all_expands_to_every_alias() {
    let mut tree = populated_tree();
    tree.add("obs/ocn/mo/ts/ERSST/ac/ersst.nc", pdo_like(&pacific_grid()));
    let mut p = parameter(&tree);
    p.reference_data_set = vec!["all".to_string()];
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let summary = run(&tree, &p, &catalog).unwrap();
    let keys: Vec<&String> = summary.results["CanESM2"].keys().collect();
    assert_eq!(keys, vec!["alternate1", DEFAULT_REFERENCE_KEY]);
}

#[test]
fn test_missing_observation_aborts_run() {
    let tree = populated_tree();
    let mut p = parameter(&tree);
    p.reference_data_set = vec!["alternate1".to_string()];
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let err = run(&tree, &p, &catalog).unwrap_err();
    assert!(matches!(err, pmp_metrics::MetricsError::Dataset(ref e) if e.is_not_found()));
}

#[test]
fn test_unknown_mode_rejected() {
    let tree = populated_tree();
    let mut p = parameter(&tree);
    p.variability_mode = "enso".to_string();
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    assert!(matches!(
        ModePipeline::new(&p, &catalog, tree.reader(), &InterpolationRegridder, None),
        Err(pmp_metrics::MetricsError::UnknownMode(_))
    ));
}

#[test]
fn test_results_written_under_results_dir() {
    let tree = populated_tree();
    let p = parameter(&tree);
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let summary = run(&tree, &p, &catalog).unwrap();
    let path = results::output_path(&p, "mo", "atm");
    summary.write(&path).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "var_mode_pdo_eof1_stat_cmip5_historical_r1i1p1_mo_atm_1950-1959.json"
    );
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(written["RESULTS"]["ACCESS1-0"][DEFAULT_REFERENCE_KEY]["pdo"]["cor"].is_f64());
}

#[test]
fn test_model_kept_when_reference_mask_unreadable() {
    let tree = populated_tree();
    let p = parameter(&tree);
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let generator: &dyn LandSeaMaskGenerator = &Unreadable;
    let summary = ModePipeline::new(&p, &catalog, tree.reader(), &InterpolationRegridder, Some(generator))
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(summary.models().collect::<Vec<_>>(), vec!["ACCESS1-0", "CanESM2"]);
    assert!(summary.get("ACCESS1-0", "default", "pdo").unwrap().cor > 0.999);
}

#[test]
fn test_atmospheric_mode_ignores_land_fraction() {
    // Global 10° band covering the North Atlantic domain across the date line.
    let grid = GridSpec::uniform(22.5, 6, 10.0, 0.0, 36, 10.0);
    let nao_like = || {
        generators::standing_mode("psl", &grid.lats(), &grid.lons(), START_YEAR, MONTHS, |j, i| {
            100.0 * (1.0 + (j as f32 - 2.5) * 0.4 + (i % 7) as f32 * 0.05)
        })
    };

    let mut tree = DatasetTree::new();
    tree.add("obs/atm/mo/psl/ERA/ac/psl_era.nc", nao_like());
    tree.add(
        "models/psl_Amon_ACCESS1-0_historical_r1i1p1_195001-195912.nc",
        nao_like(),
    );
    tree.add(
        "models/sftlf_fx_ACCESS1-0_r0i0p0.nc",
        generators::fixed_field("sftlf", &grid.lats(), &grid.lons(), |_, _| 100.0),
    );

    let mut p = parameter(&tree);
    p.variability_mode = "nao".to_string();
    p.model_versions = vec!["ACCESS1-0".to_string()];
    p.target_grid = TargetGrid::Spec(grid.clone());
    let catalog = ObsCatalog::from_json(fixtures::FULL_CATALOG).unwrap();

    let summary = run(&tree, &p, &catalog).unwrap();
    let stats = summary.get("ACCESS1-0", "default", "nao").unwrap();
    assert!(stats.cor > 0.999, "cor {}", stats.cor);
    assert!(stats.rms < 1e-3, "rms {}", stats.rms);
}
