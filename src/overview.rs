// National overview.
//
// Unlike the other views the overview is not keyed by region. It narrows the
// full release list with the sidebar filters and recomputes every figure from
// the releases that are left.
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use tabled::Tabled;

use crate::chart::{ChartConfig, ChartKind};
use crate::selector::SortDirection;
use crate::types::Release;
use crate::util::{
    format_currency, format_int, format_number, parse_date_safe, percent_of, translate_status,
    truncate_label,
};
use crate::views::{card, method_label, StatCard};

/// Filter values that mean "no filter".
const MATCH_ALL: [&str; 2] = ["(All)", "(Multiple values)"];

const METHOD_CODES: [&str; 4] = ["open", "selective", "limited", "direct"];

pub const TOP_COMPANIES: usize = 8;

/// Sidebar criteria. Unset fields, blank strings and the "(All)" entries
/// leave releases through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseFilter {
    /// Buyer name, exact.
    pub institution: Option<String>,
    /// Substring of the release date, normally a year.
    pub year: Option<String>,
    /// Tender `procurementMethodDetails`, exact.
    pub method_details: Option<String>,
    /// Case-insensitive substring of any awarded supplier's name.
    pub supplier: Option<String>,
    /// Matches the tender, any award or any contract status.
    pub status: Option<String>,
    /// Spanish category label, see [`ocds_category`].
    pub category: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// Calendar day of the release.
    pub date: Option<NaiveDate>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !MATCH_ALL.contains(v))
}

impl ReleaseFilter {
    pub fn matches(&self, release: &Release) -> bool {
        let tender = release.tender.as_ref();

        if let (Some(want), Some(buyer)) = (active(&self.institution), &release.buyer) {
            if buyer.name != want {
                return false;
            }
        }
        if let (Some(year), Some(date)) = (active(&self.year), &release.date) {
            if !date.contains(year) {
                return false;
            }
        }
        if let (Some(details), Some(t)) = (active(&self.method_details), tender) {
            if t.procurement_method_details != details {
                return false;
            }
        }
        if let Some(name) = active(&self.supplier) {
            let needle = name.to_lowercase();
            let awarded = release
                .awards
                .iter()
                .flat_map(|a| &a.suppliers)
                .any(|s| s.name.to_lowercase().contains(&needle));
            if !awarded {
                return false;
            }
        }
        if let Some(status) = active(&self.status) {
            let hit = tender.is_some_and(|t| t.status == status)
                || release.awards.iter().any(|a| a.status == status)
                || release.contracts.iter().any(|c| c.status == status);
            if !hit {
                return false;
            }
        }
        if let (Some(category), Some(t)) = (active(&self.category), tender) {
            if t.main_procurement_category != ocds_category(category) {
                return false;
            }
        }
        if let Some(amount) = tender.and_then(|t| t.value.as_ref()).map(|v| v.amount) {
            if self.min_amount.is_some_and(|min| amount < min)
                || self.max_amount.is_some_and(|max| amount > max)
            {
                return false;
            }
        }
        if let (Some(day), Some(date)) = (self.date, release.date.as_deref()) {
            let release_day =
                parse_date_safe(Some(date)).or_else(|| parse_date_safe(date.get(..10)));
            if release_day != Some(day) {
                return false;
            }
        }
        true
    }
}

/// OCDS category for a Spanish sidebar label; unknown labels pass through.
pub fn ocds_category(label: &str) -> &str {
    match label {
        "Bienes" | "Medicamentos" | "Material de Curación" | "Equipos Médicos" => "goods",
        "Servicios" | "Servicios Generales" => "services",
        "Obras" => "works",
        other => other,
    }
}

pub fn filter_releases<'a>(releases: &'a [Release], filter: &ReleaseFilter) -> Vec<&'a Release> {
    releases.iter().filter(|r| filter.matches(r)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CompanyTally {
    #[tabled(rename = "Empresa")]
    pub company: String,
    #[tabled(rename = "Contratos")]
    pub contracts: u64,
    #[tabled(rename = "Monto")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodShare {
    pub method: String,
    pub count: u64,
    /// Whole percent of all counted tenders.
    pub percentage: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OverviewStats {
    pub total_contracts: u64,
    pub total_value: f64,
    pub total_suppliers: usize,
    pub active_tenders: u64,
    /// At most [`TOP_COMPANIES`], most contracts first.
    pub top_companies: Vec<CompanyTally>,
    /// Always the four method codes, in open, selective, limited, direct order.
    pub methods: Vec<MethodShare>,
}

/// Totals over `releases`.
///
/// Contract count and value come from signed contracts. Companies are tallied
/// once per award they appear in, valued at the award amount; ties keep
/// first-seen order. Suppliers are distinct by id, or by name when the id is
/// blank.
pub fn recalculate_stats<'a, I>(releases: I) -> OverviewStats
where
    I: IntoIterator<Item = &'a Release>,
{
    let mut stats = OverviewStats::default();
    let mut supplier_ids: BTreeSet<&str> = BTreeSet::new();
    let mut companies: Vec<CompanyTally> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut method_counts = [0u64; 4];

    for release in releases {
        stats.total_contracts += release.contracts.len() as u64;
        stats.total_value += release
            .contracts
            .iter()
            .filter_map(|c| c.value.as_ref())
            .map(|v| v.amount)
            .sum::<f64>();

        for award in &release.awards {
            let award_value = award.value.as_ref().map_or(0.0, |v| v.amount);
            for supplier in &award.suppliers {
                supplier_ids.insert(if supplier.id.is_empty() {
                    &supplier.name
                } else {
                    &supplier.id
                });
                let slot = *index.entry(supplier.name.as_str()).or_insert_with(|| {
                    companies.push(CompanyTally {
                        company: supplier.name.clone(),
                        contracts: 0,
                        value: 0.0,
                    });
                    companies.len() - 1
                });
                companies[slot].contracts += 1;
                companies[slot].value += award_value;
            }
        }

        if let Some(tender) = &release.tender {
            if tender.status == "active" {
                stats.active_tenders += 1;
            }
            if let Some(i) = METHOD_CODES.iter().position(|m| *m == tender.procurement_method) {
                method_counts[i] += 1;
            }
        }
    }

    companies.sort_by_key(|c| Reverse(c.contracts));
    companies.truncate(TOP_COMPANIES);
    stats.top_companies = companies;
    stats.total_suppliers = supplier_ids.len();

    let counted: u64 = method_counts.iter().sum();
    stats.methods = METHOD_CODES
        .iter()
        .zip(method_counts)
        .map(|(code, count)| MethodShare {
            method: method_label(code).to_string(),
            count,
            percentage: percent_of(count as f64, counted as f64).round() as u64,
        })
        .collect();
    stats
}

/// Whole amounts print without decimals, anything else with two.
fn plain_amount(value: f64) -> String {
    let decimals = if value.fract() == 0.0 { 0 } else { 2 };
    format_number(value, decimals)
}

pub fn overview_stat_cards(stats: &OverviewStats) -> Vec<StatCard> {
    vec![
        card("totalContratos", "Contratos", format_int(stats.total_contracts)),
        card("valorTotal", "Valor total", format!("${}", plain_amount(stats.total_value))),
        card("totalEmpresas", "Empresas", format_int(stats.total_suppliers)),
        card(
            "licitacionesActivas",
            "Licitaciones activas",
            format_int(stats.active_tenders),
        ),
    ]
}

/// Companies whose name contains `term`, ignoring case. A blank term keeps
/// every company.
pub fn filter_companies(companies: &[CompanyTally], term: &str) -> Vec<CompanyTally> {
    let needle = term.trim().to_lowercase();
    companies
        .iter()
        .filter(|c| needle.is_empty() || c.company.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Reorder by contract count. Equal counts keep their relative order.
pub fn sort_companies(companies: &mut [CompanyTally], direction: SortDirection) {
    match direction {
        SortDirection::Ascending => companies.sort_by_key(|c| c.contracts),
        SortDirection::Descending => companies.sort_by_key(|c| Reverse(c.contracts)),
    }
}

pub fn company_chart(companies: &[CompanyTally]) -> ChartConfig {
    ChartConfig::new(ChartKind::Bar, "Contratos por empresa")
        .labels(companies.iter().map(|c| truncate_label(&c.company)).collect())
        .series(
            "Número de Contratos Adjudicados",
            companies.iter().map(|c| c.contracts as f64).collect(),
        )
}

pub fn overview_methods_chart(methods: &[MethodShare]) -> ChartConfig {
    ChartConfig::new(ChartKind::Doughnut, "Métodos de contratación")
        .labels(methods.iter().map(|m| m.method.clone()).collect())
        .series("Licitaciones", methods.iter().map(|m| m.count as f64).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SignedContractRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Proveedor")]
    pub supplier: String,
    #[tabled(rename = "Monto")]
    pub amount: String,
    #[tabled(rename = "Firma")]
    pub signed: String,
    #[tabled(rename = "Estado")]
    pub status: String,
}

/// The `limit` most recently signed contracts; undated ones sort last. The
/// supplier is the first one on the matching award.
pub fn recent_signed_contracts<'a, I>(releases: I, limit: usize) -> Vec<SignedContractRow>
where
    I: IntoIterator<Item = &'a Release>,
{
    let mut dated: Vec<(Option<NaiveDate>, SignedContractRow)> = Vec::new();
    for release in releases {
        for contract in &release.contracts {
            let supplier = release
                .awards
                .iter()
                .filter(|a| a.id == contract.award_id)
                .find_map(|a| a.suppliers.first())
                .map_or("Desconocido", |s| s.name.as_str());
            let (amount, currency) = contract.value.as_ref().map_or((0.0, "USD"), |v| {
                (v.amount, v.currency.as_deref().unwrap_or("USD"))
            });
            let signed = parse_date_safe(contract.date_signed.as_deref());
            dated.push((
                signed,
                SignedContractRow {
                    id: contract.id.clone(),
                    supplier: supplier.to_string(),
                    amount: format_currency(amount, currency, 2),
                    signed: signed
                        .map(|d| d.format("%d/%m/%Y").to_string())
                        .unwrap_or_else(|| "-".into()),
                    status: translate_status(&contract.status),
                },
            ));
        }
    }
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.into_iter().take(limit).map(|(_, row)| row).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TenderProgress {
    #[tabled(rename = "Licitación")]
    pub title: String,
    #[tabled(rename = "Avance (%)")]
    pub progress: u8,
}

/// Rough completion for a tender status.
pub fn progress_for_status(status: &str) -> u8 {
    match status {
        "planning" => 20,
        "planned" => 40,
        "active" => 60,
        "cancelled" | "unsuccessful" | "complete" | "withdrawn" => 100,
        _ => 50,
    }
}

/// First `limit` titled tenders that are not complete.
pub fn tender_progress<'a, I>(releases: I, limit: usize) -> Vec<TenderProgress>
where
    I: IntoIterator<Item = &'a Release>,
{
    releases
        .into_iter()
        .filter_map(|r| r.tender.as_ref())
        .filter(|t| !t.title.is_empty() && t.status != "complete")
        .take(limit)
        .map(|t| TenderProgress {
            title: t.title.clone(),
            progress: progress_for_status(&t.status),
        })
        .collect()
}
