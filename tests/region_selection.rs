use chrono::NaiveDate;
use procurement_dashboard::config::DashboardConfig;
use procurement_dashboard::dashboard::Dashboard;
use procurement_dashboard::error::{DashboardError, Result};
use procurement_dashboard::loader::{DatasetKind, DatasetSource};
use procurement_dashboard::sample::SampleGenerator;
use procurement_dashboard::selector::{RegionDataSelector, SortDirection, SortKey};
use procurement_dashboard::types::{ContractDataset, ContractRecord};

struct Offline;

impl DatasetSource for Offline {
    fn fetch(&self, name: &str) -> Result<String> {
        Err(DashboardError::Fetch {
            name: name.to_string(),
            reason: "offline".into(),
        })
    }
}

fn sample_dashboard() -> Dashboard {
    Dashboard::with_samples(
        DashboardConfig::default(),
        Box::new(Offline),
        SampleGenerator::new(5, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
    )
}

fn dataset(json: &str) -> ContractDataset {
    serde_json::from_str(json).unwrap()
}

fn contract(id: &str, value: f64, date: &str) -> String {
    format!(
        r#"{{"id": "{id}", "title": "Obra {id}", "supplier": "Constructora Hernández S.A.",
            "method": "open", "status": "active", "value": {value}, "date": "{date}"}}"#
    )
}

#[test]
fn exact_key_wins_then_first_normalized_match() {
    let ds = dataset(
        r#"{"HIDALGO": {"stats": {"total": 10}}, "hidalgo": {"stats": {"total": 99}}}"#,
    );
    let mut sel: RegionDataSelector<ContractRecord> =
        RegionDataSelector::new(ds, "hidalgo", "nacional", 10);
    assert_eq!(sel.current_record().unwrap().stats.total, 99);

    let view = sel.select_region("Hidalgo").unwrap();
    assert_eq!(view.region, "HIDALGO");
    assert_eq!(view.record.stats.total, 10);

    let view = sel.select_region("hidalgo").unwrap();
    assert_eq!(view.record.stats.total, 99);
}

#[test]
fn unknown_region_keeps_previous_selection() {
    let ds = dataset(
        r#"{"nacional": {"stats": {"total": 1283}}, "JALISCO": {"stats": {"total": 20}}}"#,
    );
    let mut sel = RegionDataSelector::new(ds, "nacional", "nacional", 10);
    sel.select_region("Jalisco").unwrap();
    let err = sel.select_region("ATLANTIS").unwrap_err();
    assert!(matches!(err, DashboardError::NoRegionData(name) if name == "ATLANTIS"));
    assert_eq!(sel.current_region(), Some("JALISCO"));
    assert_eq!(sel.current_record().unwrap().stats.total, 20);

    let view = sel.select_or_default("ATLANTIS").unwrap();
    assert_eq!(view.region, "nacional");
}

#[test]
fn accents_do_not_matter() {
    let ds = dataset(
        r#"{"NUEVO LEÓN": {"stats": {"total": 143}}, "nacional": {"stats": {"total": 1}}}"#,
    );
    let mut sel = RegionDataSelector::new(ds, "nacional", "nacional", 10);
    assert_eq!(sel.select_region("nuevo leon").unwrap().record.stats.total, 143);
}

#[test]
fn search_sort_and_paging_work_together() {
    let contracts: Vec<String> = (1..=23)
        .map(|i| {
            contract(
                &format!("HID-2025-{i:04}"),
                i as f64 * 1000.0,
                &format!("2025-01-{:02}", i),
            )
        })
        .collect();
    let json = format!(
        r#"{{"hidalgo": {{"stats": {{"total": 23}}, "contracts": [{}]}}}}"#,
        contracts.join(",")
    );
    let mut sel = RegionDataSelector::new(dataset(&json), "hidalgo", "nacional", 10);
    assert_eq!(sel.total_pages(), 3);

    let view = sel.set_page(9).unwrap();
    assert_eq!(view.pagination.current, 3);
    assert_eq!(view.page_items.len(), 3);

    let view = sel.search("  HID-2025-001 ").unwrap();
    assert_eq!(view.pagination.current, 1);
    assert_eq!(view.total_items, 10);

    let view = sel.sort(SortKey::Value, SortDirection::Descending).unwrap();
    assert_eq!(view.page_items[0].id, "HID-2025-0019");

    let view = sel.sort(SortKey::Date, SortDirection::Ascending).unwrap();
    assert_eq!(view.page_items[0].id, "HID-2025-0010");

    let view = sel.search("").unwrap();
    assert_eq!(view.total_items, 23);
}

#[test]
fn map_click_discards_older_pending_request() {
    let mut dash = sample_dashboard();
    let pending = dash.begin_request();
    dash.click_state("Oaxaca").unwrap();
    let applied = dash
        .complete_selection(pending, DatasetKind::Map, "CHIAPAS")
        .unwrap();
    assert!(!applied);
    assert_eq!(dash.selected_state(), Some("OAXACA"));
    assert_eq!(dash.current_region(DatasetKind::Map).as_deref(), Some("OAXACA"));
}

#[test]
fn clearing_or_defaulting_discards_older_pending_request() {
    let mut dash = sample_dashboard();
    let pending = dash.begin_request();
    dash.clear_selection(DatasetKind::Contracts).unwrap();
    assert!(!dash
        .complete_selection(pending, DatasetKind::Contracts, "jalisco")
        .unwrap());
    assert_eq!(dash.current_region(DatasetKind::Contracts).as_deref(), Some("nacional"));

    let pending = dash.begin_request();
    dash.select_or_default(DatasetKind::Contracts, "hidalgo").unwrap();
    assert!(!dash
        .complete_selection(pending, DatasetKind::Contracts, "jalisco")
        .unwrap());
    assert_eq!(dash.current_region(DatasetKind::Contracts).as_deref(), Some("hidalgo"));
}
