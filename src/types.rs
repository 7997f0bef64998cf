use chrono::NaiveDate;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::marker::PhantomData;
use tabled::Tabled;

use crate::resolver;

/// Per-region records for one view, in the order the source document listed
/// them. Key order matters: the normalized lookup returns the first match.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDataset<R> {
    entries: Vec<(String, R)>,
}

impl<R> Default for RegionDataset<R> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<R> RegionDataset<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, region: impl Into<String>, record: R) {
        let region = region.into();
        match self.entries.iter_mut().find(|(k, _)| *k == region) {
            Some(slot) => slot.1 = record,
            None => self.entries.push((region, record)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// Look a region up the way the map does: exact, then normalized.
    /// Returns the matched dataset key alongside the record.
    pub fn lookup(&self, query: &str) -> Option<(&str, &R)> {
        let key = resolver::resolve(self.keys(), query)?;
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }
}

impl<R> FromIterator<(String, R)> for RegionDataset<R> {
    fn from_iter<I: IntoIterator<Item = (String, R)>>(iter: I) -> Self {
        let mut ds = RegionDataset::new();
        for (k, r) in iter {
            ds.insert(k, r);
        }
        ds
    }
}

impl<'de, R: Deserialize<'de>> Deserialize<'de> for RegionDataset<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DatasetVisitor<R>(PhantomData<R>);

        impl<'de, R: Deserialize<'de>> Visitor<'de> for DatasetVisitor<R> {
            type Value = RegionDataset<R>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by region name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut ds = RegionDataset::new();
                while let Some((k, v)) = map.next_entry::<String, R>()? {
                    ds.insert(k, v);
                }
                Ok(ds)
            }
        }

        deserializer.deserialize_map(DatasetVisitor(PhantomData))
    }
}

impl<R: Serialize> Serialize for RegionDataset<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub stats: ContractStats,
    #[serde(default)]
    pub status_distribution: Vec<StatusCount>,
    #[serde(default)]
    pub method_distribution: Vec<MethodCount>,
    #[serde(default)]
    pub trend_by_month: Option<MonthlyTrend>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStats {
    pub total: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub avg_value: f64,
    #[serde(default)]
    pub avg_duration: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MethodCount {
    pub method: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct MonthlyTrend {
    pub months: Vec<String>,
    pub counts: Vec<f64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Contract {
    pub id: String,
    pub title: String,
    pub supplier: String,
    pub method: String,
    pub status: String,
    pub value: f64,
    pub date: String,
}

impl Contract {
    /// Contract dates arrive either as `YYYY-MM-DD` or as full ISO timestamps.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        crate::util::parse_date_safe(Some(&self.date))
    }
}

// ---------------------------------------------------------------------------
// Suppliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRecord {
    pub stats: SupplierStats,
    pub market_concentration: MarketConcentration,
    #[serde(default)]
    pub categories: Vec<CategoryCount>,
    #[serde(default)]
    pub top_suppliers: Vec<Supplier>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierStats {
    pub total: u64,
    #[serde(default)]
    pub avg_contracts: f64,
    #[serde(default)]
    pub avg_value: f64,
    #[serde(default)]
    pub concentration_index: f64,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct MarketConcentration {
    pub top10: ConcentrationShare,
    pub others: ConcentrationShare,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationShare {
    pub contracts: u64,
    #[serde(default)]
    pub value_percentage: f64,
    #[serde(default)]
    pub contracts_percentage: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Supplier {
    pub name: String,
    #[serde(default)]
    pub id: String,
    pub contracts: u64,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Institutions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct InstitutionRecord {
    #[serde(rename = "totalInstituciones", default)]
    pub total_institutions: u64,
    #[serde(rename = "tiposInstitucion", default)]
    pub types: Vec<InstitutionType>,
    #[serde(rename = "topInstituciones", default)]
    pub top_institutions: Vec<Institution>,
    #[serde(rename = "contratacionesPorAnio", default)]
    pub yearly: Option<InstitutionTrend>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct InstitutionType {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "cantidad")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Institution {
    #[serde(rename = "institucion")]
    pub name: String,
    #[serde(rename = "contratos")]
    pub contracts: u64,
    #[serde(rename = "monto")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct InstitutionTrend {
    #[serde(rename = "anios")]
    pub years: Vec<String>,
    #[serde(rename = "secretarias")]
    pub ministries: Vec<f64>,
    #[serde(rename = "descentralizados")]
    pub decentralized: Vec<f64>,
    #[serde(rename = "estatales")]
    pub local_governments: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Currencies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CurrencyRecord {
    #[serde(rename = "montoTotalCurrency")]
    pub totals: Vec<CurrencyTotal>,
    #[serde(rename = "tendencia", default)]
    pub trend: Option<CurrencyTrend>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CurrencyTotal {
    pub total: f64,
    pub currency: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct CurrencyTrend {
    #[serde(rename = "periodos")]
    pub periods: Vec<String>,
    pub mxn: Vec<f64>,
    #[serde(rename = "otras")]
    pub others: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// One state on the choropleth: contract count for shading, the procurement
/// method split (open, selective, limited, direct) and its latest contracts.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct MapStateRecord {
    pub contracts: u64,
    #[serde(default)]
    pub methods: Vec<u64>,
    #[serde(default)]
    pub recent: Vec<RecentContract>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize, Tabled)]
pub struct RecentContract {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Proveedor")]
    pub supplier: String,
    #[tabled(rename = "Monto")]
    pub amount: f64,
    #[tabled(rename = "Fecha")]
    pub date: String,
    #[tabled(rename = "Estado")]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Overview releases
// ---------------------------------------------------------------------------

/// The overview document: a flat list of procurement releases, each with its
/// tender, awards and signed contracts.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct ReleasePackage {
    #[serde(default)]
    pub releases: Vec<Release>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Release {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub buyer: Option<Party>,
    #[serde(default)]
    pub tender: Option<Tender>,
    #[serde(default)]
    pub awards: Vec<Award>,
    #[serde(default)]
    pub contracts: Vec<ReleaseContract>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Party {
    #[serde(default)]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Amount {
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub procurement_method: String,
    #[serde(default)]
    pub procurement_method_details: String,
    #[serde(default)]
    pub main_procurement_category: String,
    #[serde(default)]
    pub value: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Award {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub suppliers: Vec<Party>,
    #[serde(default)]
    pub value: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseContract {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "awardID")]
    pub award_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub value: Option<Amount>,
    #[serde(default)]
    pub date_signed: Option<String>,
}

pub type ContractDataset = RegionDataset<ContractRecord>;
pub type SupplierDataset = RegionDataset<SupplierRecord>;
pub type InstitutionDataset = RegionDataset<InstitutionRecord>;
pub type CurrencyDataset = RegionDataset<CurrencyRecord>;
pub type MapDataset = RegionDataset<MapStateRecord>;
