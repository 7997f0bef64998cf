// Region selection state for one view.
//
// A selector owns one dataset plus everything the user has chosen on top of
// it: region, search term, sort and page. Every transition rebuilds the
// filtered list from the record, so nothing derived survives a region switch.
use tracing::{debug, error, info};

use crate::error::{DashboardError, Result};
use crate::resolver;
use crate::types::{
    Contract, ContractRecord, CurrencyRecord, CurrencyTotal, Institution, InstitutionRecord,
    MapStateRecord, RecentContract, RegionDataset, Supplier, SupplierRecord,
};
use crate::views::{self, PaginationState, RankedEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Value,
    Contracts,
    ValuePerContract,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A per-region record that carries a flat list the table pages through.
pub trait RegionRecord {
    type Item: Clone;

    fn items(&self) -> &[Self::Item];

    /// `needle` is already trimmed and lower-cased.
    fn matches(item: &Self::Item, needle: &str) -> bool;

    /// Numeric projection for sorting; `None` when the item has no such field.
    fn sort_value(item: &Self::Item, key: SortKey) -> Option<f64>;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn date_value(date: &str) -> Option<f64> {
    crate::util::parse_date_safe(Some(date)).map(|d| {
        use chrono::Datelike;
        d.num_days_from_ce() as f64
    })
}

impl RegionRecord for ContractRecord {
    type Item = Contract;

    fn items(&self) -> &[Contract] {
        &self.contracts
    }

    fn matches(c: &Contract, needle: &str) -> bool {
        [&c.id, &c.title, &c.supplier, &c.method, &c.status]
            .iter()
            .any(|f| contains_ci(f, needle))
    }

    fn sort_value(c: &Contract, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Value => Some(c.value),
            SortKey::Date => date_value(&c.date),
            SortKey::Contracts | SortKey::ValuePerContract => None,
        }
    }
}

impl RegionRecord for SupplierRecord {
    type Item = Supplier;

    fn items(&self) -> &[Supplier] {
        &self.suppliers
    }

    fn matches(s: &Supplier, needle: &str) -> bool {
        contains_ci(&s.name, needle) || contains_ci(&s.id, needle)
    }

    fn sort_value(s: &Supplier, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Value => Some(s.value),
            SortKey::Contracts => Some(s.contracts as f64),
            SortKey::ValuePerContract => Some(s.value_per_contract()),
            SortKey::Date => None,
        }
    }
}

impl RegionRecord for InstitutionRecord {
    type Item = Institution;

    fn items(&self) -> &[Institution] {
        &self.top_institutions
    }

    fn matches(i: &Institution, needle: &str) -> bool {
        contains_ci(&i.name, needle)
    }

    fn sort_value(i: &Institution, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Value => Some(i.amount),
            SortKey::Contracts => Some(i.contracts as f64),
            SortKey::ValuePerContract => Some(i.value_per_contract()),
            SortKey::Date => None,
        }
    }
}

impl RegionRecord for CurrencyRecord {
    type Item = CurrencyTotal;

    fn items(&self) -> &[CurrencyTotal] {
        &self.totals
    }

    fn matches(t: &CurrencyTotal, needle: &str) -> bool {
        contains_ci(&t.currency, needle) || contains_ci(&t.name, needle)
    }

    fn sort_value(t: &CurrencyTotal, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Value => Some(t.total),
            _ => None,
        }
    }
}

impl RegionRecord for MapStateRecord {
    type Item = RecentContract;

    fn items(&self) -> &[RecentContract] {
        &self.recent
    }

    fn matches(c: &RecentContract, needle: &str) -> bool {
        [&c.id, &c.supplier, &c.status]
            .iter()
            .any(|f| contains_ci(f, needle))
    }

    fn sort_value(c: &RecentContract, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Value => Some(c.amount),
            SortKey::Date => date_value(&c.date),
            _ => None,
        }
    }
}

/// Snapshot of a selector after a transition: what every dependent view
/// recomputes from.
#[derive(Debug)]
pub struct SelectionView<'a, R: RegionRecord> {
    pub region: &'a str,
    pub record: &'a R,
    pub search: &'a str,
    pub page_items: &'a [R::Item],
    pub total_items: usize,
    pub pagination: PaginationState,
}

#[derive(Debug, Clone)]
pub struct RegionDataSelector<R: RegionRecord> {
    dataset: RegionDataset<R>,
    default_region: String,
    current_region: Option<String>,
    page: usize,
    page_size: usize,
    search: String,
    sort: Option<(SortKey, SortDirection)>,
    filtered: Vec<R::Item>,
}

impl<R: RegionRecord> RegionDataSelector<R> {
    /// Start on `initial_region`, or the default region if the dataset has no
    /// such key, or the first region as a last resort.
    pub fn new(
        dataset: RegionDataset<R>,
        initial_region: &str,
        default_region: &str,
        page_size: usize,
    ) -> Self {
        let mut sel = Self {
            dataset,
            default_region: default_region.to_string(),
            current_region: None,
            page: 1,
            page_size: page_size.max(1),
            search: String::new(),
            sort: None,
            filtered: Vec::new(),
        };
        let start = [initial_region, default_region]
            .into_iter()
            .find_map(|q| resolver::resolve(sel.dataset.keys(), q))
            .or_else(|| sel.dataset.keys().next())
            .map(str::to_string);
        match start {
            Some(key) => {
                sel.current_region = Some(key);
                sel.refilter();
            }
            None => error!("dataset is empty, nothing to select"),
        }
        sel
    }

    pub fn dataset(&self) -> &RegionDataset<R> {
        &self.dataset
    }

    pub fn current_region(&self) -> Option<&str> {
        self.current_region.as_deref()
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn current_record(&self) -> Option<&R> {
        self.current_region
            .as_deref()
            .and_then(|k| self.dataset.get(k))
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn sort_order(&self) -> Option<(SortKey, SortDirection)> {
        self.sort
    }

    pub fn filtered(&self) -> &[R::Item] {
        &self.filtered
    }

    pub fn total_pages(&self) -> usize {
        views::page_count(self.filtered.len(), self.page_size)
    }

    /// Switch to `name`. An unknown region is logged and reported, and the
    /// current selection stays exactly as it was.
    pub fn select_region(&mut self, name: &str) -> Result<SelectionView<'_, R>> {
        let Some(key) = resolver::resolve(self.dataset.keys(), name).map(str::to_string) else {
            error!(region = name, "no data available for region");
            return Err(DashboardError::NoRegionData(name.to_string()));
        };
        info!(region = %key, "region selected");
        self.current_region = Some(key);
        self.page = 1;
        self.search.clear();
        self.refilter();
        self.view()
    }

    /// Like [`select_region`](Self::select_region) but an unknown region lands
    /// on the default aggregate instead of failing.
    pub fn select_or_default(&mut self, name: &str) -> Result<SelectionView<'_, R>> {
        if resolver::resolve(self.dataset.keys(), name).is_some() {
            return self.select_region(name);
        }
        debug!(region = name, fallback = %self.default_region, "falling back to default region");
        let default = self.default_region.clone();
        self.select_region(&default)
    }

    pub fn clear_selection(&mut self) -> Result<SelectionView<'_, R>> {
        let default = self.default_region.clone();
        self.select_region(&default)
    }

    pub fn search(&mut self, term: &str) -> Result<SelectionView<'_, R>> {
        self.search = term.trim().to_lowercase();
        self.page = 1;
        self.refilter();
        debug!(term = %self.search, hits = self.filtered.len(), "search applied");
        self.view()
    }

    pub fn sort(&mut self, key: SortKey, direction: SortDirection) -> Result<SelectionView<'_, R>> {
        self.sort = Some((key, direction));
        self.apply_sort();
        self.view()
    }

    pub fn set_page(&mut self, n: usize) -> Result<SelectionView<'_, R>> {
        self.page = views::clamp_page(n, self.filtered.len(), self.page_size);
        self.view()
    }

    pub fn next_page(&mut self) -> Result<SelectionView<'_, R>> {
        self.set_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> Result<SelectionView<'_, R>> {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn view(&self) -> Result<SelectionView<'_, R>> {
        let (region, record) = self
            .current_region
            .as_deref()
            .and_then(|k| self.dataset.get(k).map(|r| (k, r)))
            .ok_or_else(|| DashboardError::NoRegionData(self.default_region.clone()))?;
        let total_pages = self.total_pages();
        Ok(SelectionView {
            region,
            record,
            search: &self.search,
            page_items: views::page_slice(&self.filtered, self.page, self.page_size),
            total_items: self.filtered.len(),
            pagination: views::pagination_state(self.page, total_pages),
        })
    }

    fn refilter(&mut self) {
        let Some(record) = self.current_record() else {
            self.filtered.clear();
            return;
        };
        let filtered: Vec<R::Item> = if self.search.is_empty() {
            record.items().to_vec()
        } else {
            record
                .items()
                .iter()
                .filter(|i| R::matches(i, &self.search))
                .cloned()
                .collect()
        };
        self.filtered = filtered;
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        let Some((key, dir)) = self.sort else {
            return;
        };
        // Items without the key sort as the smallest value.
        let measure = |i: &R::Item| R::sort_value(i, key).unwrap_or(f64::NEG_INFINITY);
        self.filtered.sort_by(|a, b| {
            let ord = measure(a).total_cmp(&measure(b));
            match dir {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContractStats;

    fn contract(id: &str, supplier: &str, value: f64, date: &str) -> Contract {
        Contract {
            id: id.into(),
            title: format!("Obra {id}"),
            supplier: supplier.into(),
            method: "open".into(),
            status: "active".into(),
            value,
            date: date.into(),
        }
    }

    fn record(total: u64, contracts: Vec<Contract>) -> ContractRecord {
        ContractRecord {
            stats: ContractStats {
                total,
                active: total / 2,
                avg_value: 1000.0,
                avg_duration: 120.0,
            },
            status_distribution: vec![],
            method_distribution: vec![],
            trend_by_month: None,
            contracts,
        }
    }

    fn dataset() -> RegionDataset<ContractRecord> {
        let jalisco = (0..20)
            .map(|i| {
                contract(
                    &format!("JAL-{i:04}"),
                    "Tapatía S.A.",
                    i as f64 * 10.0,
                    "2025-01-01",
                )
            })
            .collect();
        let nacional = vec![
            contract("NAC-1", "Constructora Hernández S.A.", 300.0, "2025-03-01"),
            contract("NAC-2", "TechSolutions Inc.", 100.0, "2025-01-15"),
            contract("NAC-3", "Grupo Logístico", 200.0, "2024-12-01"),
        ];
        let mut ds = RegionDataset::new();
        ds.insert("NACIONAL", record(3, nacional));
        ds.insert("JALISCO", record(20, jalisco));
        ds.insert("YUCATÁN", record(0, vec![]));
        ds
    }

    fn selector() -> RegionDataSelector<ContractRecord> {
        RegionDataSelector::new(dataset(), "jalisco", "NACIONAL", 10)
    }

    #[test]
    fn starts_on_resolved_initial_region() {
        let sel = selector();
        assert_eq!(sel.current_region(), Some("JALISCO"));
        assert_eq!(sel.filtered().len(), 20);
        let fallback = RegionDataSelector::new(dataset(), "atlantis", "nacional", 10);
        assert_eq!(fallback.current_region(), Some("NACIONAL"));
    }

    #[test]
    fn unknown_region_leaves_state_untouched() {
        let mut sel = selector();
        sel.set_page(2).unwrap();
        let err = sel.select_region("ATLANTIS").unwrap_err();
        assert!(matches!(err, DashboardError::NoRegionData(r) if r == "ATLANTIS"));
        assert_eq!(sel.current_region(), Some("JALISCO"));
        assert_eq!(sel.page(), 2);
        assert_eq!(sel.view().unwrap().record.stats.total, 20);
    }

    #[test]
    fn accent_insensitive_selection() {
        let mut sel = selector();
        let view = sel.select_region("yucatan").unwrap();
        assert_eq!(view.region, "YUCATÁN");
        assert_eq!(view.total_items, 0);
        assert_eq!(view.pagination.total_pages, 1);
    }

    #[test]
    fn select_then_clear_restores_default_view() {
        let mut sel = RegionDataSelector::new(dataset(), "NACIONAL", "NACIONAL", 10);
        let before = sel.view().unwrap().record.stats.clone();
        sel.select_region("Jalisco").unwrap();
        let after = sel.clear_selection().unwrap();
        assert_eq!(after.region, "NACIONAL");
        assert_eq!(after.record.stats, before);
        assert_eq!(after.total_items, 3);
    }

    #[test]
    fn select_or_default_falls_back() {
        let mut sel = selector();
        let view = sel.select_or_default("Atlantis").unwrap();
        assert_eq!(view.region, "NACIONAL");
    }

    #[test]
    fn search_is_case_insensitive_and_resets_page() {
        let mut sel = RegionDataSelector::new(dataset(), "NACIONAL", "NACIONAL", 2);
        sel.set_page(2).unwrap();
        let view = sel.search("  TECHsolutions ").unwrap();
        assert_eq!(view.total_items, 1);
        assert_eq!(view.page_items[0].id, "NAC-2");
        assert_eq!(sel.page(), 1);
        let all = sel.search("   ").unwrap();
        assert_eq!(all.total_items, 3);
    }

    #[test]
    fn search_covers_every_text_field() {
        let mut sel = RegionDataSelector::new(dataset(), "NACIONAL", "NACIONAL", 10);
        assert_eq!(sel.search("obra nac-3").unwrap().total_items, 1);
        assert_eq!(sel.search("OPEN").unwrap().total_items, 3);
        assert_eq!(sel.search("active").unwrap().total_items, 3);
        assert_eq!(sel.search("zzz").unwrap().total_items, 0);
    }

    #[test]
    fn region_switch_clears_search() {
        let mut sel = selector();
        sel.search("JAL-0001").unwrap();
        assert_eq!(sel.filtered().len(), 1);
        sel.select_region("NACIONAL").unwrap();
        assert_eq!(sel.search_term(), "");
        assert_eq!(sel.filtered().len(), 3);
    }

    #[test]
    fn sort_by_value_and_date() {
        let mut sel = RegionDataSelector::new(dataset(), "NACIONAL", "NACIONAL", 10);
        let ids = |v: &SelectionView<'_, ContractRecord>| {
            v.page_items.iter().map(|c| c.id.clone()).collect::<Vec<_>>()
        };
        let v = sel.sort(SortKey::Value, SortDirection::Descending).unwrap();
        assert_eq!(ids(&v), vec!["NAC-1", "NAC-3", "NAC-2"]);
        let v = sel.sort(SortKey::Date, SortDirection::Ascending).unwrap();
        assert_eq!(ids(&v), vec!["NAC-3", "NAC-2", "NAC-1"]);
        // sort survives a search
        let v = sel.search("s.a.").unwrap();
        assert_eq!(ids(&v), vec!["NAC-1"]);
    }

    #[test]
    fn pages_clamp_to_range() {
        let mut sel = selector();
        assert_eq!(sel.total_pages(), 2);
        assert_eq!(sel.view().unwrap().page_items.len(), 10);
        let v = sel.set_page(99).unwrap();
        assert_eq!(v.pagination.current, 2);
        assert_eq!(v.page_items.len(), 10);
        assert_eq!(sel.set_page(0).unwrap().pagination.current, 1);
        sel.next_page().unwrap();
        sel.next_page().unwrap();
        assert_eq!(sel.page(), 2);
        sel.prev_page().unwrap();
        sel.prev_page().unwrap();
        assert_eq!(sel.page(), 1);
    }

    #[test]
    fn empty_dataset_has_no_view() {
        let sel: RegionDataSelector<ContractRecord> =
            RegionDataSelector::new(RegionDataset::new(), "x", "y", 10);
        assert!(sel.current_region().is_none());
        assert!(matches!(sel.view(), Err(DashboardError::NoRegionData(_))));
    }
}
