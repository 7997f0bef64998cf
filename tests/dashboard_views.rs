use std::collections::HashMap;

use chrono::NaiveDate;
use procurement_dashboard::config::DashboardConfig;
use procurement_dashboard::dashboard::{self, Dashboard};
use procurement_dashboard::error::{DashboardError, Result};
use procurement_dashboard::loader::{DatasetKind, DatasetSource, FileSource, Origin};
use procurement_dashboard::output;
use procurement_dashboard::sample::SampleGenerator;
use procurement_dashboard::surface::MemorySurface;
use procurement_dashboard::types::Supplier;

struct StaticSource(HashMap<&'static str, &'static str>);

impl DatasetSource for StaticSource {
    fn fetch(&self, name: &str) -> Result<String> {
        self.0
            .get(name)
            .map(|s| s.to_string())
            .ok_or_else(|| DashboardError::Fetch {
                name: name.to_string(),
                reason: "not found".into(),
            })
    }
}

const SUPPLIERS: &str = r#"{
  "nacional": {
    "stats": {"total": 3, "avgContracts": 5.0, "avgValue": 1000.0, "concentrationIndex": 99.0},
    "marketConcentration": {
      "top10": {"contracts": 30, "valuePercentage": 10.0, "contractsPercentage": 10.0, "totalValue": 750.0},
      "others": {"contracts": 10, "valuePercentage": 90.0, "contractsPercentage": 90.0, "totalValue": 250.0}
    },
    "categories": [{"category": "Construcción", "count": 2}, {"category": "Salud", "count": 1}],
    "suppliers": [
      {"name": "Alfa", "id": "A", "contracts": 1, "value": 900.0},
      {"name": "Beta, \"La Buena\"", "id": "B", "contracts": 20, "value": 100.0}
    ]
  }
}"#;

fn dashboard(files: &[(&'static str, &'static str)]) -> Dashboard {
    let mut config = DashboardConfig::default();
    config.initial_region = "nacional".into();
    Dashboard::with_samples(
        config,
        Box::new(StaticSource(files.iter().copied().collect())),
        SampleGenerator::new(3, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
    )
}

#[test]
fn concentration_is_recomputed_from_totals() {
    let mut dash = dashboard(&[("supplier-data", SUPPLIERS)]);
    let mut surface = MemorySurface::new();
    assert!(dash.refresh(&mut surface, DatasetKind::Suppliers));
    assert_eq!(dash.origin(DatasetKind::Suppliers), Origin::Fetched);
    assert_eq!(surface.texts["concentrationIndex"], "75.0%");
    assert_eq!(surface.charts[dashboard::CONCENTRATION_CHART].series[0].data, vec![75.0, 25.0]);

    dash.toggle_concentration();
    dash.refresh(&mut surface, DatasetKind::Suppliers);
    assert_eq!(surface.charts[dashboard::CONCENTRATION_CHART].series[0].data, vec![75.0, 25.0]);
    assert!(surface.texts[dashboard::CONCENTRATION_NOTE].contains("número de contratos"));
}

#[test]
fn ranking_key_changes_the_order() {
    let mut dash = dashboard(&[("supplier-data", SUPPLIERS)]);
    let mut surface = MemorySurface::new();
    dash.refresh(&mut surface, DatasetKind::Suppliers);
    assert_eq!(surface.charts[dashboard::TOP_SUPPLIERS_CHART].labels[0], "Alfa");
    dash.set_supplier_rank(procurement_dashboard::views::RankKey::Contracts);
    dash.refresh(&mut surface, DatasetKind::Suppliers);
    assert_eq!(surface.charts[dashboard::TOP_SUPPLIERS_CHART].labels[0], "Beta, \"La Buena\"");
}

#[test]
fn one_broken_view_does_not_stop_the_others() {
    let mut dash = dashboard(&[("supplier-data", SUPPLIERS)]);
    let mut surface = MemorySurface::new().without_target(dashboard::TOP_SUPPLIERS_CHART);
    let results = dash.refresh_all(&mut surface);
    let failed: Vec<DatasetKind> = results.iter().filter(|(_, ok)| !ok).map(|(v, _)| *v).collect();
    assert_eq!(failed, vec![DatasetKind::Suppliers]);
    assert!(surface.texts.contains_key("totalContractsCount"));
    assert!(!surface.texts.contains_key("totalSuppliersCount"));
}

#[test]
fn exported_csv_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut dash = dashboard(&[("supplier-data", SUPPLIERS)]);
    let path = dash.export_csv(DatasetKind::Suppliers, dir.path()).unwrap();
    assert!(path.ends_with("suppliers_nacional.csv"));

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["name", "id", "contracts", "value"]);
    let rows: Vec<Supplier> = rdr.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].name, "Beta, \"La Buena\"");

    let text = output::to_csv_string(&rows).unwrap();
    assert!(text.contains("\"Beta, \"\"La Buena\"\"\""));
}

#[test]
fn file_source_falls_back_per_dataset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("contract-data.json"), "{ broken").unwrap();
    std::fs::write(dir.path().join("supplier-data.json"), SUPPLIERS).unwrap();

    let mut config = DashboardConfig::default();
    config.data_dir = dir.path().to_path_buf();
    let source = FileSource::new(config.data_dir.clone());
    let mut dash = Dashboard::new(config, Box::new(source));

    assert_eq!(dash.origin(DatasetKind::Contracts), Origin::Sample);
    assert_eq!(dash.origin(DatasetKind::Suppliers), Origin::Fetched);
    assert_eq!(dash.origin(DatasetKind::Map), Origin::Sample);

    // "hidalgo" is not in the supplier file, so the default region is shown.
    assert_eq!(dash.current_region(DatasetKind::Suppliers).as_deref(), Some("nacional"));
    assert_eq!(dash.current_region(DatasetKind::Contracts).as_deref(), Some("hidalgo"));
}

const MAP: &str = r#"{
    "OAXACA": {"contracts": 52},
    "NACIONAL": {"contracts": 52, "methods": [20, 15, 5, 12],
                 "recent": [{"id": "CON-1", "supplier": "X", "amount": 5.0, "date": "01/03/2025", "status": "Activo"}]}
}"#;

#[test]
fn map_falls_back_to_national_data() {
    let mut dash = dashboard(&[("map-data", MAP)]);
    let mut surface = MemorySurface::new();
    assert_eq!(dash.click_state("oaxaca").unwrap().as_deref(), Some("OAXACA"));
    assert!(dash.refresh(&mut surface, DatasetKind::Map));
    let chart = &surface.charts[dashboard::METHODS_CHART];
    assert_eq!(chart.series[0].data, vec![20.0, 15.0, 5.0, 12.0]);
    assert_eq!(surface.tables[dashboard::MAP_STATES].rows.len(), 1);
    assert_eq!(surface.tables[dashboard::MAP_STATES].rows[0][2], "density-medium");
    // Oaxaca has no recent contracts of its own.
    let recent = &surface.tables[dashboard::RECENT_CONTRACTS_TABLE];
    assert_eq!(recent.rows.len(), 1);
    assert_eq!(recent.rows[0][0], "CON-1");
}

#[test]
fn overview_search_narrows_and_clear_resets() {
    let mut dash = dashboard(&[]);
    let mut surface = MemorySurface::new();
    assert!(dash.refresh(&mut surface, DatasetKind::Overview));
    assert_eq!(dash.origin(DatasetKind::Overview), Origin::Sample);
    assert!(surface.texts.contains_key("totalContratos"));
    assert!(surface.texts["valorTotal"].starts_with('$'));

    let labels = surface.charts[dashboard::COMPANY_CHART].labels.clone();
    assert!(!labels.is_empty() && labels.len() <= 8);
    let stem: String = labels[0].chars().take(4).collect();
    let matches = dash.search(DatasetKind::Overview, &stem.to_uppercase()).unwrap();
    assert!(matches >= 1 && matches <= labels.len());
    assert_eq!(dash.search(DatasetKind::Overview, "zzz-no-such-company").unwrap(), 0);
    assert!(dash.refresh(&mut surface, DatasetKind::Overview));
    assert!(surface.charts[dashboard::COMPANY_CHART].labels.is_empty());

    dash.clear_selection(DatasetKind::Overview).unwrap();
    assert!(dash.overview().company_term.is_empty());
    dash.refresh(&mut surface, DatasetKind::Overview);
    assert_eq!(surface.charts[dashboard::COMPANY_CHART].labels, labels);
}

#[test]
fn overview_filter_with_no_matches_shows_placeholder() {
    let mut dash = dashboard(&[]);
    let mut surface = MemorySurface::new();
    dash.set_overview_filter(procurement_dashboard::overview::ReleaseFilter {
        min_amount: Some(f64::MAX),
        ..Default::default()
    });
    assert!(dash.refresh(&mut surface, DatasetKind::Overview));
    assert_eq!(surface.texts["totalContratos"], "0");
    assert!(surface.tables[dashboard::SIGNED_CONTRACTS_TABLE].placeholder.is_some());
}

#[test]
fn map_export_writes_the_selected_state_summary() {
    let mut dash = dashboard(&[]);
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        dash.export_csv(DatasetKind::Map, dir.path()),
        Err(DashboardError::NothingSelected(_))
    ));

    dash.click_state("Oaxaca").unwrap();
    let path = dash.export_csv(DatasetKind::Map, dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "datos_oaxaca.csv");

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        [
            "Nombre",
            "Contratos",
            "Licitación Pública",
            "Invitación",
            "Adjudicación Limitada",
            "Adjudicación Directa",
        ]
    );
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "OAXACA");
}
