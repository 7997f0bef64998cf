// View controllers.
//
// The dashboard owns one selector per view, the chart slots and the toggles.
// A refresh builds the whole frame for a view before touching the surface, so
// a view that fails (missing target, no renderer, bad data) leaves the surface
// as it was and the other views keep working.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::chart::{AxisScale, ChartConfig, ChartKind, ChartSlot};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::loader::{DatasetCache, DatasetKind, DatasetSource, Origin, RequestSequencer, Ticket};
use crate::output;
use crate::overview::{self, CompanyTally, ReleaseFilter};
use crate::resolver;
use crate::sample::SampleGenerator;
use crate::selector::{RegionDataSelector, SortDirection, SortKey};
use crate::surface::{RenderSurface, TableContent};
use crate::types::{
    ContractRecord, CurrencyRecord, InstitutionRecord, MapStateRecord, RecentContract,
    SupplierRecord,
};
use crate::util::format_int;
use crate::views::{
    self, ConcentrationView, DensityClass, RankKey, StateSummaryRow, TrendWindow, NO_RESULTS,
};

pub const CONTRACT_STATUS_CHART: &str = "contractStatusChart";
pub const CONTRACT_METHOD_CHART: &str = "contractMethodChart";
pub const CONTRACT_TREND_CHART: &str = "contractTrendChart";
pub const CONTRACTS_TABLE: &str = "contractsTableBody";
pub const CONTRACT_STATUS_DETAIL: &str = "contractStatusDetail";

pub const CONCENTRATION_CHART: &str = "marketConcentrationChart";
pub const CONCENTRATION_NOTE: &str = "concentrationNote";
pub const CONCENTRATION_DETAIL: &str = "concentrationDetail";
pub const CATEGORY_CHART: &str = "supplierCategoryChart";
pub const TOP_SUPPLIERS_CHART: &str = "topSuppliersChart";
pub const SUPPLIERS_TABLE: &str = "suppliersTableBody";

pub const TOTAL_INSTITUTIONS: &str = "totalInstitutionsCount";
pub const INSTITUTION_TYPE_CHART: &str = "institutionTypeChart";
pub const TOP_INSTITUTIONS_CHART: &str = "topInstitutionsChart";
pub const INSTITUTION_TREND_CHART: &str = "institutionTrendChart";
pub const INSTITUTIONS_TABLE: &str = "institutionsTableBody";

pub const CURRENCY_CHART: &str = "currencyChart";
pub const CURRENCY_TREND_CHART: &str = "currencyTrendChart";
pub const CURRENCY_TABLE: &str = "currencyTableBody";
pub const CURRENCY_GRAND_TOTAL: &str = "currencyGrandTotal";

pub const MAP_STATES: &str = "mexicoMap";
pub const METHODS_CHART: &str = "methodsChart";
pub const RECENT_CONTRACTS_TABLE: &str = "recentContractsTable";
pub const SELECTED_STATE: &str = "selectedStateName";
pub const MAP_LEGEND: &str = "mapLegend";

pub const COMPANY_CHART: &str = "companyContractsChart";
pub const PROCUREMENT_METHOD_CHART: &str = "procurementMethodChart";
pub const SIGNED_CONTRACTS_TABLE: &str = "recentContractsBody";
pub const TENDER_PROGRESS_TABLE: &str = "tenderProgress";

/// Rows in the overview's signed-contract and tender-progress tables.
const OVERVIEW_ROWS: usize = 5;

/// Display toggles that survive region switches.
#[derive(Debug, Clone, PartialEq)]
pub struct Toggles {
    pub concentration: ConcentrationView,
    pub supplier_rank: RankKey,
    pub institution_rank: RankKey,
    /// Institution types as a doughnut (hole) instead of a full pie.
    pub institution_doughnut: bool,
    pub currency_scale: AxisScale,
    pub contract_trend: TrendWindow,
    pub institution_trend: TrendWindow,
    pub currency_trend: TrendWindow,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            concentration: ConcentrationView::Value,
            supplier_rank: RankKey::Value,
            institution_rank: RankKey::Contracts,
            institution_doughnut: false,
            currency_scale: AxisScale::Logarithmic,
            contract_trend: TrendWindow::All,
            institution_trend: TrendWindow::All,
            currency_trend: TrendWindow::All,
        }
    }
}

/// Everything one view writes, collected before anything is drawn.
#[derive(Debug, Default)]
struct Frame {
    charts: Vec<(&'static str, ChartConfig)>,
    texts: Vec<(String, String)>,
    tables: Vec<(&'static str, TableContent)>,
}

impl Frame {
    fn chart(&mut self, id: &'static str, config: ChartConfig) {
        self.charts.push((id, config));
    }

    fn text(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.texts.push((id.into(), text.into()));
    }

    fn table(&mut self, id: &'static str, table: TableContent) {
        self.tables.push((id, table));
    }

    fn targets(&self) -> impl Iterator<Item = &str> {
        self.charts
            .iter()
            .map(|(id, _)| *id)
            .chain(self.texts.iter().map(|(id, _)| id.as_str()))
            .chain(self.tables.iter().map(|(id, _)| *id))
    }
}

/// Run `$body` against the view's selector. The overview has none and
/// evaluates `$overview` instead.
macro_rules! with_selector {
    ($dash:expr, $view:expr, |$sel:ident| $body:expr, overview => $overview:expr) => {
        match $view {
            DatasetKind::Contracts => {
                let $sel = $dash.contract_selector();
                $body
            }
            DatasetKind::Suppliers => {
                let $sel = $dash.supplier_selector();
                $body
            }
            DatasetKind::Institutions => {
                let $sel = $dash.institution_selector();
                $body
            }
            DatasetKind::Currencies => {
                let $sel = $dash.currency_selector();
                $body
            }
            DatasetKind::Map => {
                let $sel = $dash.map_selector();
                $body
            }
            DatasetKind::Overview => $overview,
        }
    };
}

fn not_regional<T>(view: DatasetKind) -> Result<T> {
    Err(DashboardError::NotRegional(view.slug().to_string()))
}

/// Sidebar filters and company-chart controls of the overview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverviewState {
    pub filter: ReleaseFilter,
    pub company_term: String,
    pub company_order: Option<SortDirection>,
}

pub struct Dashboard {
    config: DashboardConfig,
    cache: DatasetCache,
    sequencer: RequestSequencer,
    toggles: Toggles,
    slots: BTreeMap<&'static str, ChartSlot>,
    contracts: Option<RegionDataSelector<ContractRecord>>,
    suppliers: Option<RegionDataSelector<SupplierRecord>>,
    institutions: Option<RegionDataSelector<InstitutionRecord>>,
    currencies: Option<RegionDataSelector<CurrencyRecord>>,
    map: Option<RegionDataSelector<MapStateRecord>>,
    map_selected: Option<String>,
    map_hover: Option<String>,
    overview: OverviewState,
}

impl Dashboard {
    /// Sample data, when needed, is dated relative to today.
    pub fn new(config: DashboardConfig, source: Box<dyn DatasetSource>) -> Self {
        let samples = SampleGenerator::new(config.sample_seed, chrono::Local::now().date_naive());
        Self::with_samples(config, source, samples)
    }

    pub fn with_samples(
        config: DashboardConfig,
        source: Box<dyn DatasetSource>,
        samples: SampleGenerator,
    ) -> Self {
        Self {
            config,
            cache: DatasetCache::new(source, samples),
            sequencer: RequestSequencer::new(),
            toggles: Toggles::default(),
            slots: BTreeMap::new(),
            contracts: None,
            suppliers: None,
            institutions: None,
            currencies: None,
            map: None,
            map_selected: None,
            map_hover: None,
            overview: OverviewState::default(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DashboardConfig {
        &mut self.config
    }

    pub fn toggles(&self) -> &Toggles {
        &self.toggles
    }

    fn contract_selector(&mut self) -> &mut RegionDataSelector<ContractRecord> {
        let (cfg, cache) = (&self.config, &self.cache);
        self.contracts.get_or_insert_with(|| {
            RegionDataSelector::new(
                cache.contracts().dataset.clone(),
                &cfg.initial_region,
                &cfg.default_region,
                cfg.page_size,
            )
        })
    }

    fn supplier_selector(&mut self) -> &mut RegionDataSelector<SupplierRecord> {
        let (cfg, cache) = (&self.config, &self.cache);
        self.suppliers.get_or_insert_with(|| {
            RegionDataSelector::new(
                cache.suppliers().dataset.clone(),
                &cfg.initial_region,
                &cfg.default_region,
                cfg.page_size,
            )
        })
    }

    fn institution_selector(&mut self) -> &mut RegionDataSelector<InstitutionRecord> {
        let (cfg, cache) = (&self.config, &self.cache);
        self.institutions.get_or_insert_with(|| {
            RegionDataSelector::new(
                cache.institutions().dataset.clone(),
                &cfg.initial_region,
                &cfg.default_region,
                cfg.page_size,
            )
        })
    }

    fn currency_selector(&mut self) -> &mut RegionDataSelector<CurrencyRecord> {
        let (cfg, cache) = (&self.config, &self.cache);
        self.currencies.get_or_insert_with(|| {
            RegionDataSelector::new(
                cache.currencies().dataset.clone(),
                &cfg.initial_region,
                &cfg.default_region,
                cfg.page_size,
            )
        })
    }

    /// The map starts on, and clears back to, the national aggregate.
    fn map_selector(&mut self) -> &mut RegionDataSelector<MapStateRecord> {
        let (cfg, cache) = (&self.config, &self.cache);
        self.map.get_or_insert_with(|| {
            RegionDataSelector::new(
                cache.map().dataset.clone(),
                &cfg.map_default_region,
                &cfg.map_default_region,
                cfg.page_size,
            )
        })
    }

    /// Whether the view's dataset came from its file or from sample data.
    /// Loads the dataset if this is the first use.
    pub fn origin(&self, view: DatasetKind) -> Origin {
        match view {
            DatasetKind::Contracts => self.cache.contracts().origin,
            DatasetKind::Suppliers => self.cache.suppliers().origin,
            DatasetKind::Institutions => self.cache.institutions().origin,
            DatasetKind::Currencies => self.cache.currencies().origin,
            DatasetKind::Map => self.cache.map().origin,
            DatasetKind::Overview => self.cache.releases().origin,
        }
    }

    // -- selection ----------------------------------------------------------

    /// Start a region request. Only the most recent ticket can complete.
    pub fn begin_request(&self) -> Ticket {
        self.sequencer.issue()
    }

    /// Apply a region request started with [`begin_request`](Self::begin_request).
    /// Returns `Ok(false)` when a newer request has started since.
    pub fn complete_selection(
        &mut self,
        ticket: Ticket,
        view: DatasetKind,
        name: &str,
    ) -> Result<bool> {
        if self.sequencer.accept(ticket, ()).is_none() {
            return Ok(false);
        }
        let region = with_selector!(
            self,
            view,
            |sel| sel.select_region(name).map(|v| v.region.to_string()),
            overview => not_regional(view)
        )?;
        if view == DatasetKind::Map {
            self.map_selected = (region != self.config.map_default_region).then_some(region);
            self.map_hover = None;
        }
        Ok(true)
    }

    /// Direct region changes win over any request still in flight.
    fn supersede(&self) {
        let ticket = self.sequencer.issue();
        debug!(?ticket, "pending region requests superseded");
    }

    pub fn select_region(&mut self, view: DatasetKind, name: &str) -> Result<()> {
        let ticket = self.begin_request();
        self.complete_selection(ticket, view, name).map(|_| ())
    }

    /// Select `name`, landing on the default region when it is unknown.
    /// Returns the region actually shown.
    pub fn select_or_default(&mut self, view: DatasetKind, name: &str) -> Result<String> {
        self.supersede();
        let region = with_selector!(
            self,
            view,
            |sel| sel.select_or_default(name).map(|v| v.region.to_string()),
            overview => not_regional(view)
        )?;
        if view == DatasetKind::Map {
            self.map_selected = (region != self.config.map_default_region).then(|| region.clone());
            self.map_hover = None;
        }
        Ok(region)
    }

    pub fn clear_selection(&mut self, view: DatasetKind) -> Result<()> {
        self.supersede();
        if view == DatasetKind::Map {
            self.map_selected = None;
            self.map_hover = None;
        }
        with_selector!(
            self,
            view,
            |sel| sel.clear_selection().map(|_| ()),
            overview => {
                self.overview = OverviewState::default();
                Ok(())
            }
        )
    }

    pub fn current_region(&mut self, view: DatasetKind) -> Option<String> {
        with_selector!(
            self,
            view,
            |sel| sel.current_region().map(str::to_string),
            overview => None
        )
    }

    /// Returns how many items match. On the overview `term` narrows the
    /// company chart.
    pub fn search(&mut self, view: DatasetKind, term: &str) -> Result<usize> {
        with_selector!(
            self,
            view,
            |sel| sel.search(term).map(|v| v.total_items),
            overview => {
                self.overview.company_term = term.trim().to_string();
                Ok(self.overview_companies().len())
            }
        )
    }

    /// On the overview only the direction applies: companies always order by
    /// contract count.
    pub fn sort(
        &mut self,
        view: DatasetKind,
        key: SortKey,
        direction: SortDirection,
    ) -> Result<()> {
        with_selector!(
            self,
            view,
            |sel| sel.sort(key, direction).map(|_| ()),
            overview => {
                self.overview.company_order = Some(direction);
                Ok(())
            }
        )
    }

    /// Returns the page actually shown after clamping.
    pub fn set_page(&mut self, view: DatasetKind, page: usize) -> Result<usize> {
        with_selector!(
            self,
            view,
            |sel| sel.set_page(page).map(|v| v.pagination.current),
            overview => Ok(1)
        )
    }

    pub fn next_page(&mut self, view: DatasetKind) -> Result<usize> {
        with_selector!(
            self,
            view,
            |sel| sel.next_page().map(|v| v.pagination.current),
            overview => Ok(1)
        )
    }

    pub fn prev_page(&mut self, view: DatasetKind) -> Result<usize> {
        with_selector!(
            self,
            view,
            |sel| sel.prev_page().map(|v| v.pagination.current),
            overview => Ok(1)
        )
    }

    // -- overview -----------------------------------------------------------

    pub fn overview(&self) -> &OverviewState {
        &self.overview
    }

    pub fn set_overview_filter(&mut self, filter: ReleaseFilter) {
        info!(?filter, "overview filter applied");
        self.overview.filter = filter;
    }

    /// Top companies of the filtered releases after the search term and the
    /// chosen order.
    fn overview_companies(&self) -> Vec<CompanyTally> {
        let releases = &self.cache.releases().dataset.releases;
        let stats = overview::recalculate_stats(overview::filter_releases(
            releases,
            &self.overview.filter,
        ));
        let mut companies =
            overview::filter_companies(&stats.top_companies, &self.overview.company_term);
        if let Some(direction) = self.overview.company_order {
            overview::sort_companies(&mut companies, direction);
        }
        companies
    }

    // -- toggles ------------------------------------------------------------

    pub fn toggle_concentration(&mut self) -> ConcentrationView {
        self.toggles.concentration = self.toggles.concentration.toggled();
        self.toggles.concentration
    }

    pub fn set_supplier_rank(&mut self, key: RankKey) {
        self.toggles.supplier_rank = key;
    }

    pub fn set_institution_rank(&mut self, key: RankKey) {
        self.toggles.institution_rank = key;
    }

    pub fn toggle_institution_chart(&mut self) -> bool {
        self.toggles.institution_doughnut = !self.toggles.institution_doughnut;
        self.toggles.institution_doughnut
    }

    pub fn toggle_currency_scale(&mut self) -> AxisScale {
        self.toggles.currency_scale = match self.toggles.currency_scale {
            AxisScale::Linear => AxisScale::Logarithmic,
            AxisScale::Logarithmic => AxisScale::Linear,
        };
        self.toggles.currency_scale
    }

    /// Returns `false` for views without a trend chart.
    pub fn set_trend_window(&mut self, view: DatasetKind, window: TrendWindow) -> bool {
        let slot = match view {
            DatasetKind::Contracts => &mut self.toggles.contract_trend,
            DatasetKind::Institutions => &mut self.toggles.institution_trend,
            DatasetKind::Currencies => &mut self.toggles.currency_trend,
            DatasetKind::Suppliers | DatasetKind::Map | DatasetKind::Overview => {
                warn!(view = view.slug(), "view has no trend chart");
                return false;
            }
        };
        *slot = window;
        true
    }

    // -- map interaction ----------------------------------------------------

    /// Clicking the selected state again deselects it; any other state
    /// becomes the selection. Returns the selected state, if any.
    pub fn click_state(&mut self, name: &str) -> Result<Option<String>> {
        let same = self
            .map_selected
            .as_deref()
            .is_some_and(|s| resolver::normalize(Some(s)) == resolver::normalize(Some(name)));
        if same {
            info!(state = name, "state deselected");
            self.clear_selection(DatasetKind::Map)?;
            return Ok(None);
        }
        self.select_or_default(DatasetKind::Map, name)?;
        Ok(self.map_selected.clone())
    }

    /// Hovering only previews a state while nothing is selected.
    pub fn hover_state(&mut self, name: &str) -> bool {
        if self.map_selected.is_some() {
            return false;
        }
        self.map_hover = Some(name.to_string());
        true
    }

    pub fn leave_map(&mut self) {
        if self.map_selected.is_none() {
            self.map_hover = None;
        }
    }

    pub fn selected_state(&self) -> Option<&str> {
        self.map_selected.as_deref()
    }

    // -- rendering ----------------------------------------------------------

    /// Rebuild one view. Failures are logged and reported as `false`; the
    /// surface is left untouched for that view.
    pub fn refresh(&mut self, surface: &mut dyn RenderSurface, view: DatasetKind) -> bool {
        let result = self
            .frame_for(view)
            .and_then(|frame| self.present(surface, frame));
        match result {
            Ok(()) => {
                debug!(view = view.slug(), "view refreshed");
                true
            }
            Err(e) => {
                error!(view = view.slug(), error = %e, "view update aborted");
                false
            }
        }
    }

    pub fn refresh_all(&mut self, surface: &mut dyn RenderSurface) -> Vec<(DatasetKind, bool)> {
        DatasetKind::ALL
            .into_iter()
            .map(|view| (view, self.refresh(surface, view)))
            .collect()
    }

    pub fn live_charts(&self) -> BTreeMap<&'static str, &ChartConfig> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| slot.current().map(|c| (*id, c)))
            .collect()
    }

    pub fn chart_slot(&self, id: &str) -> Option<&ChartSlot> {
        self.slots.get(id)
    }

    fn present(&mut self, surface: &mut dyn RenderSurface, frame: Frame) -> Result<()> {
        if let Some(missing) = frame.targets().find(|id| !surface.has_target(id)) {
            return Err(DashboardError::MissingTarget(missing.to_string()));
        }
        if !frame.charts.is_empty() && !surface.has_renderer() {
            return Err(DashboardError::MissingRenderer);
        }
        for (id, config) in frame.charts {
            let slot = self.slots.entry(id).or_insert_with(|| ChartSlot::new(id));
            let change = slot.update(config)?;
            debug!(target_id = id, ?change, "chart slot updated");
            if let Some(live) = slot.current() {
                surface.draw_chart(id, live)?;
            }
        }
        for (id, text) in &frame.texts {
            surface.set_text(id, text)?;
        }
        for (id, table) in &frame.tables {
            surface.set_table(id, table)?;
        }
        Ok(())
    }

    fn frame_for(&mut self, view: DatasetKind) -> Result<Frame> {
        match view {
            DatasetKind::Contracts => self.contracts_frame(),
            DatasetKind::Suppliers => self.suppliers_frame(),
            DatasetKind::Institutions => self.institutions_frame(),
            DatasetKind::Currencies => self.currencies_frame(),
            DatasetKind::Map => self.map_frame(),
            DatasetKind::Overview => self.overview_frame(),
        }
    }

    fn overview_frame(&mut self) -> Result<Frame> {
        let releases = &self.cache.releases().dataset.releases;
        let kept = overview::filter_releases(releases, &self.overview.filter);
        debug!(total = releases.len(), kept = kept.len(), "overview filtered");
        let stats = overview::recalculate_stats(kept.iter().copied());
        let mut frame = Frame::default();

        for card in overview::overview_stat_cards(&stats) {
            frame.text(card.target, card.value);
        }
        frame.chart(COMPANY_CHART, overview::company_chart(&self.overview_companies()));
        frame.chart(
            PROCUREMENT_METHOD_CHART,
            overview::overview_methods_chart(&stats.methods),
        );

        let signed = overview::recent_signed_contracts(kept.iter().copied(), OVERVIEW_ROWS);
        let mut table = TableContent::from_rows(&signed);
        if signed.is_empty() {
            table.placeholder = Some(NO_RESULTS.to_string());
        }
        frame.table(SIGNED_CONTRACTS_TABLE, table);
        let progress = overview::tender_progress(kept.iter().copied(), OVERVIEW_ROWS);
        frame.table(TENDER_PROGRESS_TABLE, TableContent::from_rows(&progress));
        Ok(frame)
    }

    fn contracts_frame(&mut self) -> Result<Frame> {
        let currency = self.config.currency.clone();
        let window = self.toggles.contract_trend.clone();
        let sel = &*self.contract_selector();
        let view = sel.view()?;
        let record = view.record;
        let mut frame = Frame::default();

        for card in views::contract_stat_cards(&record.stats, &currency) {
            frame.text(card.target, card.value);
        }

        let status = views::status_distribution(&record.status_distribution);
        if status.labels.is_empty() {
            return Err(DashboardError::EmptyDerived("contract status distribution".into()));
        }
        frame.chart(
            CONTRACT_STATUS_CHART,
            status.to_chart(ChartKind::Doughnut, "Contratos por estado"),
        );
        frame.text(CONTRACT_STATUS_DETAIL, status.tooltips().join(" | "));

        let methods = views::distribution(
            record
                .method_distribution
                .iter()
                .map(|m| (views::method_label(&m.method), m.count)),
        );
        frame.chart(
            CONTRACT_METHOD_CHART,
            methods.to_chart(ChartKind::Pie, "Contratos por método"),
        );

        let trend = record
            .trend_by_month
            .as_ref()
            .ok_or_else(|| DashboardError::EmptyDerived("contract trend".into()))?;
        let series = views::filter_trend(
            "contract trend",
            &trend.months,
            &[
                ("Número de contratos", trend.counts.as_slice()),
                ("Valor total", trend.values.as_slice()),
            ],
            &window,
        )?;
        frame.chart(
            CONTRACT_TREND_CHART,
            series.to_chart(ChartKind::Line, "Tendencia mensual"),
        );

        let page = views::table_page(sel.filtered(), sel.page(), sel.page_size(), |c| {
            views::contract_row(c, &currency)
        });
        frame.table(CONTRACTS_TABLE, TableContent::from_page(&page));
        Ok(frame)
    }

    fn suppliers_frame(&mut self) -> Result<Frame> {
        let currency = self.config.currency.clone();
        let concentration = self.toggles.concentration;
        let rank = self.toggles.supplier_rank;
        let sel = &*self.supplier_selector();
        let record = sel.view()?.record;
        let mut frame = Frame::default();

        for card in views::supplier_stat_cards(record, &currency) {
            frame.text(card.target, card.value);
        }

        let mc = &record.market_concentration;
        frame.chart(CONCENTRATION_CHART, views::concentration_chart(mc, concentration));
        frame.text(CONCENTRATION_NOTE, concentration.note());
        frame.text(
            CONCENTRATION_DETAIL,
            views::concentration_tooltips(mc, concentration, &currency).join(" | "),
        );

        let categories =
            views::distribution(record.categories.iter().map(|c| (c.category.as_str(), c.count)));
        frame.chart(
            CATEGORY_CHART,
            categories.to_chart(ChartKind::Doughnut, "Empresas por categoría"),
        );

        let pool = if record.suppliers.is_empty() {
            &record.top_suppliers
        } else {
            &record.suppliers
        };
        if pool.is_empty() {
            return Err(DashboardError::EmptyDerived("supplier ranking".into()));
        }
        frame.chart(TOP_SUPPLIERS_CHART, views::rank_entities(pool, rank, 10).to_chart(rank));

        let page = views::table_page(sel.filtered(), sel.page(), sel.page_size(), |s| {
            views::supplier_row(s, &currency)
        });
        frame.table(SUPPLIERS_TABLE, TableContent::from_page(&page));
        Ok(frame)
    }

    fn institutions_frame(&mut self) -> Result<Frame> {
        let currency = self.config.currency.clone();
        let rank = self.toggles.institution_rank;
        let doughnut = self.toggles.institution_doughnut;
        let window = self.toggles.institution_trend.clone();
        let sel = &*self.institution_selector();
        let view = sel.view()?;
        let record = view.record;
        let national =
            resolver::normalize(Some(view.region))
                == resolver::normalize(Some(sel.default_region()));
        let mut frame = Frame::default();

        frame.text(TOTAL_INSTITUTIONS, format_int(record.total_institutions));

        let types = views::distribution(record.types.iter().map(|t| (t.kind.as_str(), t.count)));
        frame.chart(
            INSTITUTION_TYPE_CHART,
            types
                .to_chart(ChartKind::Doughnut, "Tipos de institución")
                .cutout(if doughnut { 50 } else { 0 }),
        );

        if record.top_institutions.is_empty() {
            return Err(DashboardError::EmptyDerived("institution ranking".into()));
        }
        frame.chart(
            TOP_INSTITUTIONS_CHART,
            views::rank_entities(&record.top_institutions, rank, 5).to_chart(rank),
        );

        let yearly = record
            .yearly
            .as_ref()
            .ok_or_else(|| DashboardError::EmptyDerived("institution trend".into()))?;
        let local_label = if national {
            "Gobiernos Estatales"
        } else {
            "Gobiernos Municipales"
        };
        let series = views::filter_trend(
            "institution trend",
            &yearly.years,
            &[
                ("Secretarías", yearly.ministries.as_slice()),
                ("Descentralizados", yearly.decentralized.as_slice()),
                (local_label, yearly.local_governments.as_slice()),
            ],
            &window,
        )?;
        frame.chart(
            INSTITUTION_TREND_CHART,
            series.to_chart(ChartKind::Line, "Contrataciones por año"),
        );

        let page = views::table_page(sel.filtered(), sel.page(), sel.page_size(), |i| {
            views::institution_row(i, &currency)
        });
        frame.table(INSTITUTIONS_TABLE, TableContent::from_page(&page));
        Ok(frame)
    }

    fn currencies_frame(&mut self) -> Result<Frame> {
        let base = self.config.currency.clone();
        let scale = self.toggles.currency_scale;
        let window = self.toggles.currency_trend.clone();
        let sel = &*self.currency_selector();
        let record = sel.view()?.record;
        if record.totals.is_empty() {
            return Err(DashboardError::EmptyDerived("currency totals".into()));
        }
        let mut frame = Frame::default();

        let table = views::currency_table(&record.totals);
        let visible: Vec<_> = table
            .rows
            .iter()
            .filter(|row| sel.filtered().iter().any(|t| t.currency == row.currency))
            .cloned()
            .collect();
        let mut content =
            TableContent::from_rows(&visible).with_footer(format!("Total: {}", table.grand_total));
        if visible.is_empty() {
            content.placeholder = Some(NO_RESULTS.to_string());
        }
        frame.table(CURRENCY_TABLE, content);
        frame.text(CURRENCY_GRAND_TOTAL, table.grand_total.clone());
        frame.chart(CURRENCY_CHART, views::currency_bar_chart(&record.totals, scale, &base));

        let trend = record
            .trend
            .as_ref()
            .ok_or_else(|| DashboardError::EmptyDerived("currency trend".into()))?;
        let series = views::filter_trend(
            "currency trend",
            &trend.periods,
            &[
                ("MXN", trend.mxn.as_slice()),
                ("Otras monedas", trend.others.as_slice()),
            ],
            &window,
        )?;
        frame.chart(
            CURRENCY_TREND_CHART,
            series.to_chart(ChartKind::Line, "Tendencia por moneda"),
        );
        Ok(frame)
    }

    fn map_frame(&mut self) -> Result<Frame> {
        let aggregate = self.config.map_default_region.clone();
        let selected = self.map_selected.is_some();
        let focus = self.map_selected.clone().or_else(|| self.map_hover.clone());
        let sel = &*self.map_selector();
        let data = sel.dataset();
        let mut frame = Frame::default();

        let shades = views::shade_states(data.iter().map(|(k, r)| (k, r.contracts)), &aggregate);
        frame.table(MAP_STATES, TableContent::from_rows(&shades));
        let legend: Vec<String> = [
            DensityClass::Low,
            DensityClass::Medium,
            DensityClass::High,
            DensityClass::VeryHigh,
        ]
        .iter()
        .map(|c| format!("{}: {}", c.css_class(), c.legend()))
        .collect();
        frame.text(MAP_LEGEND, legend.join(" | "));

        let national = data.lookup(&aggregate).map(|(_, r)| r);
        let focused = focus.as_deref().and_then(|f| data.lookup(f));

        let (label, methods) = match (focused, national) {
            (Some((name, rec)), _) if rec.methods.len() == 4 => (name.to_string(), &rec.methods),
            (_, Some(n)) if !n.methods.is_empty() => ("Nacional".to_string(), &n.methods),
            _ => return Err(DashboardError::NoRegionData(aggregate)),
        };
        frame.chart(
            METHODS_CHART,
            views::methods_chart(methods, &format!("Métodos de contratación - {label}")),
        );
        frame.text(
            SELECTED_STATE,
            focused.map(|(name, _)| name).unwrap_or("Nacional"),
        );

        let own_recent_empty = focused.is_some_and(|(_, r)| r.recent.is_empty());
        let recent = if (selected || focused.is_none()) && !own_recent_empty {
            let page = views::table_page(
                sel.filtered(),
                sel.page(),
                sel.page_size(),
                |c: &RecentContract| c.clone(),
            );
            TableContent::from_page(&page)
        } else {
            let rows = focused
                .map(|(_, r)| &r.recent)
                .filter(|r| !r.is_empty())
                .or(national.map(|n| &n.recent))
                .map(|r| r.as_slice())
                .unwrap_or_default();
            let mut content = TableContent::from_rows(rows);
            if rows.is_empty() {
                content.placeholder = Some(NO_RESULTS.to_string());
            }
            content
        };
        frame.table(RECENT_CONTRACTS_TABLE, recent);
        Ok(frame)
    }

    // -- export -------------------------------------------------------------

    /// The selected map state as a one-row summary.
    fn selected_state_summary(&mut self) -> Result<StateSummaryRow> {
        let state = self
            .map_selected
            .clone()
            .ok_or_else(|| DashboardError::NothingSelected("state".into()))?;
        let data = self.map_selector().dataset();
        let (name, record) = data
            .lookup(&state)
            .ok_or_else(|| DashboardError::NoRegionData(state.clone()))?;
        Ok(views::state_summary(name, record))
    }

    /// Write the view's current rows to `dir`.
    ///
    /// Region views write their filtered list to `<view>_<region>.csv`. The map
    /// writes the selected state's summary to `datos_<state>.csv` and refuses
    /// when nothing is selected. The overview writes its company chart rows.
    pub fn export_csv(&mut self, view: DatasetKind, dir: &Path) -> Result<PathBuf> {
        match view {
            DatasetKind::Map => {
                let row = self.selected_state_summary()?;
                let path = dir.join(output::export_file_name("datos", &row.name));
                output::export_csv(&path, &[row])?;
                Ok(path)
            }
            DatasetKind::Overview => {
                let path = dir.join(output::export_file_name(view.slug(), "empresas"));
                output::export_csv(&path, &self.overview_companies())?;
                Ok(path)
            }
            _ => with_selector!(
                self,
                view,
                |sel| {
                    let region = sel
                        .current_region()
                        .unwrap_or(sel.default_region())
                        .to_string();
                    let path = dir.join(output::export_file_name(view.slug(), &region));
                    output::export_csv(&path, sel.filtered())?;
                    Ok(path)
                },
                overview => not_regional(view)
            ),
        }
    }

    /// Same rows as [`export_csv`](Self::export_csv), as a string.
    pub fn export_csv_string(&mut self, view: DatasetKind) -> Result<String> {
        match view {
            DatasetKind::Map => output::to_csv_string(&[self.selected_state_summary()?]),
            DatasetKind::Overview => output::to_csv_string(&self.overview_companies()),
            _ => with_selector!(
                self,
                view,
                |sel| output::to_csv_string(sel.filtered()),
                overview => not_regional(view)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use chrono::NaiveDate;

    struct Offline;

    impl DatasetSource for Offline {
        fn fetch(&self, name: &str) -> Result<String> {
            Err(DashboardError::Fetch {
                name: name.to_string(),
                reason: "offline".into(),
            })
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::with_samples(
            DashboardConfig::default(),
            Box::new(Offline),
            SampleGenerator::new(11, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
        )
    }

    #[test]
    fn contracts_view_fills_cards_charts_and_table() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new();
        assert!(dash.refresh(&mut surface, DatasetKind::Contracts));
        assert_eq!(surface.texts["totalContractsCount"], "327");
        assert_eq!(surface.texts["averageDuration"], "158 días");
        assert!(surface.texts[CONTRACT_STATUS_DETAIL].starts_with("Activo: 198 ("));
        assert_eq!(surface.charts[CONTRACT_TREND_CHART].labels.len(), 6);
        assert_eq!(surface.tables[CONTRACTS_TABLE].rows.len(), 10);
        assert_eq!(dash.origin(DatasetKind::Contracts), Origin::Sample);
    }

    #[test]
    fn missing_target_aborts_only_that_view() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new().without_target(CONTRACTS_TABLE);
        let results = dash.refresh_all(&mut surface);
        assert_eq!(results[0], (DatasetKind::Contracts, false));
        assert!(results[1..].iter().all(|(_, ok)| *ok));
        assert!(!surface.charts.contains_key(CONTRACT_STATUS_CHART));
        assert!(surface.charts.contains_key(CONCENTRATION_CHART));
    }

    #[test]
    fn missing_renderer_is_reported() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new().without_renderer();
        assert!(!dash.refresh(&mut surface, DatasetKind::Suppliers));
        assert!(surface.texts.is_empty());
    }

    #[test]
    fn toggles_update_charts_in_place() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new();
        dash.refresh(&mut surface, DatasetKind::Currencies);
        assert_eq!(dash.toggle_currency_scale(), AxisScale::Linear);
        dash.refresh(&mut surface, DatasetKind::Currencies);
        let slot = dash.chart_slot(CURRENCY_CHART).unwrap();
        assert_eq!(slot.generation(), 1);
        assert_eq!(slot.current().unwrap().value_scale, Some(AxisScale::Linear));

        dash.refresh(&mut surface, DatasetKind::Institutions);
        dash.toggle_institution_chart();
        dash.refresh(&mut surface, DatasetKind::Institutions);
        assert_eq!(surface.charts[INSTITUTION_TYPE_CHART].cutout, Some(50));
        assert_eq!(dash.chart_slot(INSTITUTION_TYPE_CHART).unwrap().generation(), 1);
    }

    #[test]
    fn third_institution_series_depends_on_region() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new();
        dash.refresh(&mut surface, DatasetKind::Institutions);
        assert_eq!(
            surface.charts[INSTITUTION_TREND_CHART].series[2].label,
            "Gobiernos Municipales"
        );
        dash.clear_selection(DatasetKind::Institutions).unwrap();
        dash.refresh(&mut surface, DatasetKind::Institutions);
        assert_eq!(surface.charts[INSTITUTION_TREND_CHART].series[2].label, "Gobiernos Estatales");
    }

    #[test]
    fn trend_window_that_empties_the_chart_aborts_view() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new();
        assert!(dash.set_trend_window(DatasetKind::Contracts, TrendWindow::parse("2019")));
        assert!(!dash.refresh(&mut surface, DatasetKind::Contracts));
        assert!(!dash.set_trend_window(DatasetKind::Map, TrendWindow::All));
    }

    #[test]
    fn clicking_a_state_twice_deselects_it() {
        let mut dash = dashboard();
        assert_eq!(dash.click_state("Oaxaca").unwrap().as_deref(), Some("OAXACA"));
        assert!(!dash.hover_state("CHIAPAS"));
        assert_eq!(dash.click_state("OAXACA").unwrap(), None);
        assert_eq!(dash.current_region(DatasetKind::Map).as_deref(), Some("NACIONAL"));
        assert!(dash.hover_state("CHIAPAS"));
    }

    #[test]
    fn hover_previews_state_and_falls_back_to_national() {
        let mut dash = dashboard();
        let mut surface = MemorySurface::new();
        dash.hover_state("Yucatán");
        dash.refresh(&mut surface, DatasetKind::Map);
        assert_eq!(surface.texts[SELECTED_STATE], "YUCATÁN");
        dash.hover_state("Atlantis");
        dash.refresh(&mut surface, DatasetKind::Map);
        assert_eq!(surface.texts[SELECTED_STATE], "Nacional");
        assert!(surface.charts[METHODS_CHART].title.ends_with("Nacional"));
        assert_eq!(surface.tables[RECENT_CONTRACTS_TABLE].rows.len(), 5);
    }

    #[test]
    fn stale_selection_is_discarded() {
        let mut dash = dashboard();
        let slow = dash.begin_request();
        let fast = dash.begin_request();
        assert!(dash.complete_selection(fast, DatasetKind::Contracts, "jalisco").unwrap());
        assert!(!dash.complete_selection(slow, DatasetKind::Contracts, "nacional").unwrap());
        assert_eq!(dash.current_region(DatasetKind::Contracts).as_deref(), Some("jalisco"));
    }

    #[test]
    fn export_writes_filtered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard();
        dash.search(DatasetKind::Currencies, "euro").unwrap();
        let path = dash.export_csv(DatasetKind::Currencies, dir.path()).unwrap();
        assert!(path.ends_with("currencies_hidalgo.csv"));
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("total,currency,name"));
    }
}
