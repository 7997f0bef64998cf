// Pure view-model builders.
//
// Each function takes a region's record (plus the current toggles) and returns
// the payload a chart, table or stat card needs. Derived figures are always
// computed here from raw counts, never read back from precomputed fields.
use serde::Serialize;
use std::cmp::Ordering;
use tabled::Tabled;

use crate::chart::{AxisScale, ChartConfig, ChartKind};
use crate::error::{DashboardError, Result};
use crate::types::{
    Contract, ContractStats, CurrencyTotal, Institution, MapStateRecord, MarketConcentration,
    StatusCount, Supplier, SupplierRecord,
};
use crate::util::{
    format_currency, format_int, format_number, format_percent, format_share, percent_of,
    translate_status, truncate_label,
};

// ---------------------------------------------------------------------------
// Stat cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StatCard {
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Indicador")]
    pub label: String,
    #[tabled(rename = "Valor")]
    pub value: String,
}

pub(crate) fn card(target: &str, label: &str, value: String) -> StatCard {
    StatCard {
        target: target.to_string(),
        label: label.to_string(),
        value,
    }
}

pub fn contract_stat_cards(stats: &ContractStats, currency: &str) -> Vec<StatCard> {
    let active_share = percent_of(stats.active as f64, stats.total as f64);
    vec![
        card("totalContractsCount", "Contratos totales", format_int(stats.total)),
        card("activeContractsCount", "Contratos activos", format_int(stats.active)),
        card("activeContractsShare", "Proporción activa", format_percent(active_share)),
        card(
            "averageContractValue",
            "Valor promedio",
            format_currency(stats.avg_value, currency, 0),
        ),
        card(
            "averageDuration",
            "Duración promedio",
            format!("{} días", format_number(stats.avg_duration, 0)),
        ),
    ]
}

pub fn supplier_stat_cards(record: &SupplierRecord, currency: &str) -> Vec<StatCard> {
    let [top_share, _] =
        concentration_shares(&record.market_concentration, ConcentrationView::Value);
    vec![
        card("totalSuppliersCount", "Empresas", format_int(record.stats.total)),
        card(
            "avgContractsPerSupplier",
            "Contratos por empresa",
            format_number(record.stats.avg_contracts, 1),
        ),
        card(
            "avgValuePerSupplier",
            "Valor promedio por empresa",
            format_currency(record.stats.avg_value, currency, 0),
        ),
        card("concentrationIndex", "Índice de concentración", format_percent(top_share)),
    ]
}

// ---------------------------------------------------------------------------
// Distributions (status, method, type, category)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
    pub percentages: Vec<f64>,
}

impl Distribution {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn to_chart(&self, kind: ChartKind, title: &str) -> ChartConfig {
        ChartConfig::new(kind, title)
            .labels(self.labels.clone())
            .series(title, self.counts.iter().map(|c| *c as f64).collect())
    }

    /// Tooltip lines in the `label: count (pct%)` form.
    pub fn tooltips(&self) -> Vec<String> {
        self.labels
            .iter()
            .zip(&self.counts)
            .zip(&self.percentages)
            .map(|((l, c), p)| format!("{l}: {} ({})", format_int(*c), format_percent(*p)))
            .collect()
    }
}

/// Split `(label, count)` pairs into parallel arrays with per-slice shares.
/// An all-zero distribution yields 0% for every slice.
pub fn distribution<'a, I>(items: I) -> Distribution
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let (labels, counts): (Vec<String>, Vec<u64>) =
        items.into_iter().map(|(l, c)| (l.to_string(), c)).unzip();
    let total: u64 = counts.iter().sum();
    let percentages = counts
        .iter()
        .map(|c| percent_of(*c as f64, total as f64))
        .collect();
    Distribution {
        labels,
        counts,
        percentages,
    }
}

pub fn status_distribution(contract_status: &[StatusCount]) -> Distribution {
    let translated: Vec<(String, u64)> = contract_status
        .iter()
        .map(|s| (translate_status(&s.status), s.count))
        .collect();
    distribution(translated.iter().map(|(l, c)| (l.as_str(), *c)))
}

// ---------------------------------------------------------------------------
// Trend windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendWindow {
    All,
    /// Keep periods whose label starts with this prefix (e.g. `"2025"`).
    YearPrefix(String),
    /// Keep the last N periods.
    LastN(usize),
}

impl TrendWindow {
    /// Parse the filter values used by the period selectors:
    /// `all`, `lastN`, or anything else as a label prefix.
    pub fn parse(filter: &str) -> Self {
        let filter = filter.trim();
        if filter.is_empty() || filter.eq_ignore_ascii_case("all") {
            return TrendWindow::All;
        }
        if let Some(n) = filter.strip_prefix("last").and_then(|n| n.parse().ok()) {
            return TrendWindow::LastN(n);
        }
        TrendWindow::YearPrefix(filter.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub series: Vec<(String, Vec<f64>)>,
}

impl TrendSeries {
    pub fn to_chart(&self, kind: ChartKind, title: &str) -> ChartConfig {
        self.series.iter().fold(
            ChartConfig::new(kind, title).labels(self.labels.clone()),
            |cfg, (name, data)| cfg.series(name.clone(), data.clone()),
        )
    }
}

/// Filter parallel trend arrays, preserving order. Every series must be as
/// long as `labels`; an empty result is reported rather than drawn.
pub fn filter_trend(
    what: &str,
    labels: &[String],
    series: &[(&str, &[f64])],
    window: &TrendWindow,
) -> Result<TrendSeries> {
    if let Some((name, _)) = series.iter().find(|(_, d)| d.len() != labels.len()) {
        return Err(DashboardError::EmptyDerived(format!(
            "{what}: series '{name}' does not match {} periods",
            labels.len()
        )));
    }
    let keep: Vec<usize> = match window {
        TrendWindow::All => (0..labels.len()).collect(),
        TrendWindow::YearPrefix(prefix) => labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.starts_with(prefix.as_str()))
            .map(|(i, _)| i)
            .collect(),
        TrendWindow::LastN(n) => (labels.len().saturating_sub(*n)..labels.len()).collect(),
    };
    if keep.is_empty() {
        return Err(DashboardError::EmptyDerived(format!("{what} ({window:?})")));
    }
    Ok(TrendSeries {
        labels: keep.iter().map(|i| labels[*i].clone()).collect(),
        series: series
            .iter()
            .map(|(name, data)| (name.to_string(), keep.iter().map(|i| data[*i]).collect()))
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Market concentration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcentrationView {
    #[default]
    Value,
    Contracts,
}

impl ConcentrationView {
    pub fn toggled(self) -> Self {
        match self {
            ConcentrationView::Value => ConcentrationView::Contracts,
            ConcentrationView::Contracts => ConcentrationView::Value,
        }
    }

    pub fn note(self) -> &'static str {
        match self {
            ConcentrationView::Value => {
                "Top 10 empresas vs resto del mercado por monto adjudicado"
            }
            ConcentrationView::Contracts => {
                "Top 10 empresas vs resto del mercado por número de contratos"
            }
        }
    }
}

/// `[top10 %, others %]` recomputed from raw totals for the chosen view.
pub fn concentration_shares(mc: &MarketConcentration, view: ConcentrationView) -> [f64; 2] {
    let (top, rest) = match view {
        ConcentrationView::Value => (mc.top10.total_value, mc.others.total_value),
        ConcentrationView::Contracts => (mc.top10.contracts as f64, mc.others.contracts as f64),
    };
    let whole = top + rest;
    [percent_of(top, whole), percent_of(rest, whole)]
}

pub fn concentration_chart(mc: &MarketConcentration, view: ConcentrationView) -> ChartConfig {
    let shares = concentration_shares(mc, view);
    ChartConfig::new(ChartKind::Pie, view.note())
        .labels(vec!["Top 10 Empresas".into(), "Resto de Empresas".into()])
        .series("%", shares.to_vec())
}

/// Tooltip detail per slice: the money amount or the contract count.
pub fn concentration_tooltips(
    mc: &MarketConcentration,
    view: ConcentrationView,
    currency: &str,
) -> [String; 2] {
    let shares = concentration_shares(mc, view);
    let parts = [(&mc.top10, "Top 10 Empresas"), (&mc.others, "Resto de Empresas")];
    let mut out = [String::new(), String::new()];
    for (i, (share, label)) in parts.iter().enumerate() {
        let detail = match view {
            ConcentrationView::Value => format_currency(share.total_value, currency, 0),
            ConcentrationView::Contracts => format!("{} contratos", format_int(share.contracts)),
        };
        out[i] = format!("{label}: {} ({detail})", format_percent(shares[i]));
    }
    out
}

// ---------------------------------------------------------------------------
// Ranked bars
// ---------------------------------------------------------------------------

/// Anything that can appear on a "top entities" bar chart.
pub trait RankedEntity {
    fn display_name(&self) -> &str;
    fn contract_count(&self) -> u64;
    fn total_value(&self) -> f64;

    fn value_per_contract(&self) -> f64 {
        if self.contract_count() == 0 {
            0.0
        } else {
            self.total_value() / self.contract_count() as f64
        }
    }
}

impl RankedEntity for Supplier {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn contract_count(&self) -> u64 {
        self.contracts
    }
    fn total_value(&self) -> f64 {
        self.value
    }
}

impl RankedEntity for Institution {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn contract_count(&self) -> u64 {
        self.contracts
    }
    fn total_value(&self) -> f64 {
        self.amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankKey {
    #[default]
    Value,
    Contracts,
    ValuePerContract,
}

impl RankKey {
    pub fn label(self) -> &'static str {
        match self {
            RankKey::Value => "Monto Total Adjudicado",
            RankKey::Contracts => "Número de Contratos",
            RankKey::ValuePerContract => "Valor Promedio por Contrato",
        }
    }

    fn measure<E: RankedEntity>(self, e: &E) -> f64 {
        match self {
            RankKey::Value => e.total_value(),
            RankKey::Contracts => e.contract_count() as f64,
            RankKey::ValuePerContract => e.value_per_contract(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBars {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl RankedBars {
    pub fn to_chart(&self, key: RankKey) -> ChartConfig {
        ChartConfig::new(ChartKind::HorizontalBar, key.label())
            .labels(self.labels.clone())
            .series(key.label(), self.values.clone())
    }
}

/// Sort descending by `key` (stable on ties), keep the first `limit`, and
/// shorten long names for the axis.
pub fn rank_entities<E: RankedEntity>(items: &[E], key: RankKey, limit: usize) -> RankedBars {
    let mut sorted: Vec<&E> = items.iter().collect();
    sorted.sort_by(|a, b| {
        key.measure(*b)
            .partial_cmp(&key.measure(*a))
            .unwrap_or(Ordering::Equal)
    });
    let top = &sorted[..sorted.len().min(limit)];
    RankedBars {
        labels: top.iter().map(|e| truncate_label(e.display_name())).collect(),
        values: top.iter().map(|e| key.measure(*e)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// `ceil(len / size)`; an empty list still has one (empty) page.
pub fn page_count(len: usize, size: usize) -> usize {
    if size == 0 {
        return 1;
    }
    len.div_ceil(size).max(1)
}

pub fn clamp_page(page: usize, len: usize, size: usize) -> usize {
    page.clamp(1, page_count(len, size))
}

pub fn page_slice<T>(items: &[T], page: usize, size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(size).min(items.len());
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub current: usize,
    pub total_pages: usize,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    /// Numbered buttons to show, at most three.
    pub window: Vec<usize>,
}

pub fn pagination_state(current: usize, total_pages: usize) -> PaginationState {
    let total_pages = total_pages.max(1);
    let mut start = current.saturating_sub(1).max(1);
    let end = (start + 2).min(total_pages);
    if end.saturating_sub(start) < 2 {
        start = end.saturating_sub(2).max(1);
    }
    PaginationState {
        current,
        total_pages,
        prev_enabled: current > 1,
        next_enabled: current < total_pages,
        window: (start..=end).collect(),
    }
}

pub const NO_RESULTS: &str = "No se encontraron resultados";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage<Row> {
    pub rows: Vec<Row>,
    /// Set instead of rows when the page is empty.
    pub placeholder: Option<String>,
    pub pagination: PaginationState,
    pub total_items: usize,
}

pub fn table_page<T, Row, F>(items: &[T], page: usize, size: usize, to_row: F) -> TablePage<Row>
where
    F: Fn(&T) -> Row,
{
    let total = page_count(items.len(), size);
    let slice = page_slice(items, page, size);
    let rows: Vec<Row> = slice.iter().map(to_row).collect();
    let placeholder = rows.is_empty().then(|| NO_RESULTS.to_string());
    TablePage {
        rows,
        placeholder,
        pagination: pagination_state(page, total),
        total_items: items.len(),
    }
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ContractRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Título")]
    pub title: String,
    #[tabled(rename = "Proveedor")]
    pub supplier: String,
    #[tabled(rename = "Método")]
    pub method: String,
    #[tabled(rename = "Valor")]
    pub value: String,
    #[tabled(rename = "Estado")]
    pub status: String,
    #[tabled(rename = "Fecha")]
    pub date: String,
}

pub fn contract_row(c: &Contract, currency: &str) -> ContractRow {
    let date = c
        .parsed_date()
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string());
    ContractRow {
        id: c.id.clone(),
        title: c.title.clone(),
        supplier: c.supplier.clone(),
        method: c.method.clone(),
        value: format_currency(c.value, currency, 0),
        status: translate_status(&c.status),
        date,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SupplierRow {
    #[tabled(rename = "Empresa")]
    pub name: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Contratos")]
    pub contracts: String,
    #[tabled(rename = "Monto total")]
    pub value: String,
    #[tabled(rename = "Promedio")]
    pub avg_value: String,
}

pub fn supplier_row(s: &Supplier, currency: &str) -> SupplierRow {
    SupplierRow {
        name: s.name.clone(),
        id: s.id.clone(),
        contracts: format_int(s.contracts),
        value: format_currency(s.value, currency, 0),
        avg_value: format_currency(s.value_per_contract(), currency, 0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct InstitutionRow {
    #[tabled(rename = "Institución")]
    pub name: String,
    #[tabled(rename = "Contratos")]
    pub contracts: String,
    #[tabled(rename = "Monto")]
    pub amount: String,
    #[tabled(rename = "Promedio")]
    pub avg_amount: String,
}

pub fn institution_row(i: &Institution, currency: &str) -> InstitutionRow {
    InstitutionRow {
        name: i.name.clone(),
        contracts: format_int(i.contracts),
        amount: format_currency(i.amount, currency, 0),
        avg_amount: format_currency(i.value_per_contract(), currency, 0),
    }
}

// ---------------------------------------------------------------------------
// Currency table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CurrencyRow {
    #[tabled(rename = "Moneda")]
    pub currency: String,
    #[tabled(rename = "Nombre")]
    pub name: String,
    #[tabled(rename = "Total")]
    pub total: String,
    #[tabled(rename = "%")]
    pub share: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyTable {
    pub rows: Vec<CurrencyRow>,
    pub grand_total: String,
}

/// Rows ordered by total, largest first, with each currency's share of the
/// grand total.
pub fn currency_table(totals: &[CurrencyTotal]) -> CurrencyTable {
    let grand: f64 = totals.iter().map(|t| t.total).sum();
    let mut sorted: Vec<&CurrencyTotal> = totals.iter().collect();
    sorted.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    CurrencyTable {
        rows: sorted
            .into_iter()
            .map(|t| CurrencyRow {
                currency: t.currency.clone(),
                name: t.name.clone(),
                total: format_number(t.total, 2),
                share: format!("{}%", format_share(percent_of(t.total, grand))),
            })
            .collect(),
        grand_total: format_number(grand, 2),
    }
}

/// Totals per currency, valued in `base`, on the chosen axis scale.
pub fn currency_bar_chart(
    totals: &[CurrencyTotal],
    scale: AxisScale,
    base: &str,
) -> ChartConfig {
    let scale_name = match scale {
        AxisScale::Logarithmic => "Escala Logarítmica",
        AxisScale::Linear => "Escala Lineal",
    };
    let title = format!("Valor ({base}) - {scale_name}");
    ChartConfig::new(ChartKind::HorizontalBar, title)
        .labels(totals.iter().map(|t| t.currency.clone()).collect())
        .series("Valor Total", totals.iter().map(|t| t.total).collect())
        .scale(scale)
}

// ---------------------------------------------------------------------------
// Map shading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DensityClass {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl DensityClass {
    pub fn for_count(count: u64) -> Self {
        match count {
            0..=49 => DensityClass::Low,
            50..=99 => DensityClass::Medium,
            100..=149 => DensityClass::High,
            _ => DensityClass::VeryHigh,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            DensityClass::Low => "density-low",
            DensityClass::Medium => "density-medium",
            DensityClass::High => "density-high",
            DensityClass::VeryHigh => "density-very-high",
        }
    }

    pub fn legend(self) -> &'static str {
        match self {
            DensityClass::Low => "Menos de 50",
            DensityClass::Medium => "50 - 100",
            DensityClass::High => "101 - 150",
            DensityClass::VeryHigh => "Más de 150",
        }
    }
}

pub const METHOD_LABELS: [&str; 4] = [
    "Licitación Pública",
    "Invitación",
    "Adjudicación Limitada",
    "Adjudicación Directa",
];

/// Display label for a procurement method code; unknown codes pass through.
pub fn method_label(code: &str) -> &str {
    match code {
        "open" => METHOD_LABELS[0],
        "selective" => METHOD_LABELS[1],
        "limited" => METHOD_LABELS[2],
        "direct" => METHOD_LABELS[3],
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct StateShade {
    #[tabled(rename = "Estado")]
    pub state: String,
    #[tabled(rename = "Contratos")]
    pub contracts: u64,
    #[tabled(rename = "Densidad")]
    pub class: &'static str,
    #[tabled(skip)]
    pub tooltip: String,
}

/// Shade every state except the aggregate, keeping dataset order.
pub fn shade_states<'a, I>(states: I, aggregate: &str) -> Vec<StateShade>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    states
        .into_iter()
        .filter(|(name, _)| *name != aggregate)
        .map(|(name, count)| StateShade {
            state: name.to_string(),
            contracts: count,
            class: DensityClass::for_count(count).css_class(),
            tooltip: format!("{name}: {} contratos", format_int(count)),
        })
        .collect()
}

/// One-line CSV summary of a map state. Column names match the method chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummaryRow {
    #[serde(rename = "Nombre")]
    pub name: String,
    #[serde(rename = "Contratos")]
    pub contracts: u64,
    #[serde(rename = "Licitación Pública")]
    pub open: u64,
    #[serde(rename = "Invitación")]
    pub selective: u64,
    #[serde(rename = "Adjudicación Limitada")]
    pub limited: u64,
    #[serde(rename = "Adjudicación Directa")]
    pub direct: u64,
}

/// Missing method counts are written as 0.
pub fn state_summary(name: &str, record: &MapStateRecord) -> StateSummaryRow {
    let method = |i: usize| record.methods.get(i).copied().unwrap_or(0);
    StateSummaryRow {
        name: name.to_string(),
        contracts: record.contracts,
        open: method(0),
        selective: method(1),
        limited: method(2),
        direct: method(3),
    }
}

pub fn methods_chart(counts: &[u64], title: &str) -> ChartConfig {
    let labels = METHOD_LABELS.iter().map(|l| l.to_string()).collect();
    ChartConfig::new(ChartKind::Doughnut, title)
        .labels(labels)
        .series("Contratos", counts.iter().map(|c| *c as f64).collect())
}
