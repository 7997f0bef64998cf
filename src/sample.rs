// Fallback datasets.
//
// When a data file is missing or unreadable the dashboard still needs
// something to show. These generators produce records with the same shape as
// the JSON files, seeded so a given seed always yields the same data.
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::types::{
    Amount, Award, CategoryCount, ConcentrationShare, Contract, ContractDataset, ContractRecord,
    ContractStats, CurrencyDataset, CurrencyRecord, CurrencyTotal, CurrencyTrend, Institution,
    InstitutionDataset, InstitutionRecord, InstitutionTrend, InstitutionType, MapDataset,
    MapStateRecord, MarketConcentration, MethodCount, MonthlyTrend, Party, RecentContract,
    Release, ReleaseContract, ReleasePackage, StatusCount, Supplier, SupplierDataset,
    SupplierRecord, SupplierStats, Tender,
};
use crate::views::method_label;

const STATUSES: [&str; 4] = ["active", "pending", "terminated", "cancelled"];
const METHODS: [&str; 4] = ["open", "selective", "limited", "direct"];
const TENDER_STATUSES: [&str; 5] = ["planning", "active", "active", "complete", "cancelled"];
const CATEGORIES: [&str; 3] = ["goods", "services", "works"];

const BUYERS: [&str; 5] = [
    "Instituto Mexicano del Seguro Social",
    "Secretaría de Salud",
    "Secretaría de Educación Pública",
    "Comisión Federal de Electricidad",
    "Gobierno del Estado de Hidalgo",
];

const SUPPLIERS: [&str; 8] = [
    "Constructora Hernández S.A.",
    "TechSolutions Inc.",
    "Grupo Logístico Internacional",
    "Servicios Integrales S.A.",
    "Medical Supplies Corp.",
    "Ingeniería Avanzada",
    "Transportes Unidos",
    "Consultores Asociados",
];

const TITLES: [&str; 10] = [
    "Construcción de puente vehicular",
    "Sistema de gestión documental digital",
    "Servicios de logística para mercancías",
    "Mantenimiento de instituciones educativas",
    "Suministro de equipos médicos",
    "Desarrollo de software gubernamental",
    "Servicio de transporte de personal",
    "Consultoría en procesos administrativos",
    "Infraestructura de telecomunicaciones",
    "Modernización de sistemas hidráulicos",
];

const SUPPLIER_PREFIXES: [&str; 8] = [
    "Constructora",
    "Servicios",
    "Grupo",
    "Tecnologías",
    "Suministros",
    "Ingeniería",
    "Consultores",
    "Transportes",
];

const SUPPLIER_SUFFIXES: [&str; 6] = [
    "del Centro",
    "Integrales",
    "Asociados",
    "de México",
    "Avanzados",
    "Unidos",
];

/// Regional contract counts used to shade the map.
const STATE_COUNTS: [(&str, u64); 12] = [
    ("BAJA CALIFORNIA", 87),
    ("SONORA", 64),
    ("CHIHUAHUA", 112),
    ("NUEVO LEÓN", 143),
    ("JALISCO", 158),
    ("HIDALGO", 45),
    ("CIUDAD DE MÉXICO", 245),
    ("ESTADO DE MÉXICO", 198),
    ("OAXACA", 52),
    ("CHIAPAS", 38),
    ("YUCATÁN", 71),
    ("QUINTANA ROO", 29),
];

pub struct SampleGenerator {
    rng: StdRng,
    anchor: NaiveDate,
}

impl SampleGenerator {
    /// `anchor` is "today" for generated contract dates.
    pub fn new(seed: u64, anchor: NaiveDate) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            anchor,
        }
    }

    fn region_prefix(region: &str) -> &'static str {
        match region {
            "hidalgo" => "HID-",
            "jalisco" => "JAL-",
            _ => "NAC-",
        }
    }

    /// `count` contracts dated within six months of the anchor, newest first.
    pub fn contracts(&mut self, count: usize, region: &str) -> Vec<Contract> {
        let prefix = Self::region_prefix(region);
        let mut out: Vec<Contract> = (0..count)
            .map(|i| {
                let days_ago = self.rng.gen_range(0..6) * 30 + self.rng.gen_range(0..30);
                let date = self.anchor - Duration::days(days_ago);
                Contract {
                    id: format!("{prefix}2025-{:04}", i + 1),
                    title: pick(&mut self.rng, &TITLES),
                    supplier: pick(&mut self.rng, &SUPPLIERS),
                    method: pick(&mut self.rng, &METHODS),
                    status: pick(&mut self.rng, &STATUSES),
                    value: f64::from(self.rng.gen_range(50_000u32..5_000_000)),
                    date: date.format("%Y-%m-%d").to_string(),
                }
            })
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date));
        out
    }

    pub fn contract_dataset(&mut self) -> ContractDataset {
        let months: Vec<String> = ["2025-01", "2025-02", "2025-03", "2024-10", "2024-11", "2024-12"]
            .iter()
            .map(|m| m.to_string())
            .collect();
        let specs: [(&str, [u64; 4], [u64; 4], [f64; 2], [f64; 6], [f64; 6], usize); 3] = [
            (
                "nacional",
                [752, 187, 298, 46],
                [578, 321, 127, 257],
                [98195.03, 173.0],
                [42.0, 35.0, 50.0, 65.0, 70.0, 75.0],
                [65e6, 42e6, 78e6, 82e6, 96e6, 102e6],
                50,
            ),
            (
                "hidalgo",
                [198, 54, 62, 13],
                [148, 85, 32, 62],
                [86421.50, 158.0],
                [15.0, 12.0, 18.0, 22.0, 25.0, 28.0],
                [18.5e6, 14.2e6, 22.8e6, 24.7e6, 28.9e6, 32.5e6],
                30,
            ),
            (
                "jalisco",
                [286, 65, 87, 14],
                [203, 112, 45, 92],
                [92365.78, 165.0],
                [22.0, 19.0, 26.0, 33.0, 38.0, 42.0],
                [24.5e6, 21.2e6, 28.8e6, 34.7e6, 41.9e6, 49.5e6],
                40,
            ),
        ];
        specs
            .into_iter()
            .map(|(region, status, method, avgs, counts, values, n)| {
                let record = ContractRecord {
                    stats: ContractStats {
                        total: status.iter().sum(),
                        active: status[0],
                        avg_value: avgs[0],
                        avg_duration: avgs[1],
                    },
                    status_distribution: STATUSES
                        .iter()
                        .zip(status)
                        .map(|(s, c)| StatusCount { status: s.to_string(), count: c })
                        .collect(),
                    method_distribution: METHODS
                        .iter()
                        .zip(method)
                        .map(|(m, c)| MethodCount { method: m.to_string(), count: c })
                        .collect(),
                    trend_by_month: Some(MonthlyTrend {
                        months: months.clone(),
                        counts: counts.to_vec(),
                        values: values.to_vec(),
                    }),
                    contracts: self.contracts(n, region),
                };
                (region.to_string(), record)
            })
            .collect()
    }

    /// `count` suppliers with random contract counts and totals.
    pub fn suppliers(&mut self, count: usize, region: &str) -> Vec<Supplier> {
        let prefix = Self::region_prefix(region);
        (0..count)
            .map(|i| {
                let name = format!(
                    "{} {}",
                    pick(&mut self.rng, &SUPPLIER_PREFIXES),
                    pick(&mut self.rng, &SUPPLIER_SUFFIXES)
                );
                let contracts = self.rng.gen_range(1..=30);
                let value = f64::from(self.rng.gen_range(100_000u32..2_000_000)) * contracts as f64;
                Supplier {
                    name,
                    id: format!("{prefix}SUP-{:03}", i + 1),
                    contracts,
                    value,
                }
            })
            .collect()
    }

    pub fn supplier_dataset(&mut self) -> SupplierDataset {
        let categories = [
            "Construcción",
            "Tecnología",
            "Servicios",
            "Salud",
            "Transporte",
            "Otros",
        ];
        let specs: [(&str, u64, [f64; 2], [u64; 2], [f64; 2], [u64; 6], usize); 3] = [
            (
                "nacional",
                87,
                [14.7, 1448095.75],
                [578, 705],
                [96.5e6, 29484230.0],
                [23, 18, 15, 12, 9, 10],
                35,
            ),
            (
                "hidalgo",
                22,
                [12.3, 1150487.92],
                [148, 93],
                [23.5e6, 8912500.0],
                [7, 4, 5, 3, 0, 3],
                22,
            ),
            (
                "jalisco",
                28,
                [13.5, 1325845.36],
                [210, 119],
                [28.5e6, 9.85e6],
                [8, 6, 5, 4, 3, 2],
                28,
            ),
        ];
        specs
            .into_iter()
            .map(|(region, total, avgs, contracts, values, cats, n)| {
                let suppliers = self.suppliers(n, region);
                let mut top = suppliers.clone();
                top.sort_by(|a, b| b.value.total_cmp(&a.value));
                top.truncate(8);
                let value_whole = values[0] + values[1];
                let count_whole = (contracts[0] + contracts[1]) as f64;
                let share = |part: f64, whole: f64| part / whole * 100.0;
                let record = SupplierRecord {
                    stats: SupplierStats {
                        total,
                        avg_contracts: avgs[0],
                        avg_value: avgs[1],
                        concentration_index: share(values[0], value_whole),
                    },
                    market_concentration: MarketConcentration {
                        top10: ConcentrationShare {
                            contracts: contracts[0],
                            value_percentage: share(values[0], value_whole),
                            contracts_percentage: share(contracts[0] as f64, count_whole),
                            total_value: values[0],
                        },
                        others: ConcentrationShare {
                            contracts: contracts[1],
                            value_percentage: share(values[1], value_whole),
                            contracts_percentage: share(contracts[1] as f64, count_whole),
                            total_value: values[1],
                        },
                    },
                    categories: categories
                        .iter()
                        .zip(cats)
                        .filter(|(_, c)| *c > 0)
                        .map(|(name, count)| CategoryCount { category: name.to_string(), count })
                        .collect(),
                    top_suppliers: top,
                    suppliers,
                };
                (region.to_string(), record)
            })
            .collect()
    }

    pub fn institution_dataset(&mut self) -> InstitutionDataset {
        let national_types: [(&str, u64); 6] = [
            ("Secretaría de Estado", 12),
            ("Órgano Descentralizado", 8),
            ("Empresa Productiva del Estado", 2),
            ("Gobierno Estatal", 6),
            ("Organismo Autónomo", 5),
            ("Otros", 3),
        ];
        let national_top: [(&str, u64, f64); 5] = [
            ("Secretaría de Salud", 187, 426823789.25),
            ("Petróleos Mexicanos", 165, 1235678234.56),
            ("Secretaría de Educación Pública", 145, 312546789.34),
            ("Comisión Federal de Electricidad", 132, 892345789.12),
            ("Instituto Mexicano del Seguro Social", 121, 578923456.78),
        ];
        let hidalgo_types: [(&str, u64); 3] = [
            ("Secretaría Estatal", 5),
            ("Órgano Descentralizado", 3),
            ("Gobierno Municipal", 4),
        ];
        let hidalgo_top: [(&str, u64, f64); 5] = [
            ("Secretaría de Salud de Hidalgo", 58, 78543210.25),
            ("Secretaría de Educación Pública de Hidalgo", 47, 56321478.90),
            ("Comisión de Agua y Alcantarillado", 32, 42365987.12),
            ("Municipio de Pachuca de Soto", 28, 35698741.45),
            ("Universidad Autónoma del Estado de Hidalgo", 24, 28745123.67),
        ];

        let build = |types: &[(&str, u64)], top: &[(&str, u64, f64)], trend: InstitutionTrend| {
            InstitutionRecord {
                total_institutions: types.iter().map(|(_, c)| c).sum(),
                types: types
                    .iter()
                    .map(|(k, c)| InstitutionType { kind: k.to_string(), count: *c })
                    .collect(),
                top_institutions: top
                    .iter()
                    .map(|(n, c, a)| Institution { name: n.to_string(), contracts: *c, amount: *a })
                    .collect(),
                yearly: Some(trend),
            }
        };
        let years: Vec<String> = (2018..=2023).map(|y| y.to_string()).collect();
        let mut ds = InstitutionDataset::new();
        ds.insert(
            "nacional",
            build(
                &national_types[..],
                &national_top[..],
                InstitutionTrend {
                    years: years.clone(),
                    ministries: vec![132.0, 145.0, 158.0, 173.0, 192.0, 205.0],
                    decentralized: vec![97.0, 103.0, 115.0, 126.0, 134.0, 148.0],
                    local_governments: vec![65.0, 78.0, 87.0, 94.0, 105.0, 112.0],
                },
            ),
        );
        ds.insert(
            "hidalgo",
            build(
                &hidalgo_types[..],
                &hidalgo_top[..],
                InstitutionTrend {
                    years,
                    ministries: vec![32.0, 38.0, 41.0, 45.0, 52.0, 58.0],
                    decentralized: vec![18.0, 21.0, 24.0, 27.0, 29.0, 32.0],
                    local_governments: vec![12.0, 15.0, 18.0, 22.0, 25.0, 28.0],
                },
            ),
        );
        ds
    }

    pub fn currency_dataset(&mut self) -> CurrencyDataset {
        let names = [
            ("CAD", "Dólar Canadiense"),
            ("EUR", "Euro"),
            ("GBP", "Libra Esterlina"),
            ("JPY", "Yen Japonés"),
            ("MXN", "Peso Mexicano"),
            ("USD", "Dólar Americano"),
            ("N/E", "No Especificado"),
        ];
        let periods: Vec<String> = (2021..=2023)
            .flat_map(|y| (1..=4).map(move |q| format!("{y}-Q{q}")))
            .take(10)
            .collect();
        let specs: [(&str, [f64; 7], [f64; 10], [f64; 10]); 2] = [
            (
                "nacional",
                [
                    152365.42,
                    312456789.21,
                    250556.01,
                    6620000.0,
                    2191158137346.92,
                    4075221998.56,
                    5764397.7,
                ],
                [210e3, 230e3, 280e3, 260e3, 290e3, 320e3, 380e3, 410e3, 430e3, 460e3],
                [400.0, 450.0, 470.0, 520.0, 550.0, 600.0, 620.0, 640.0, 680.0, 710.0],
            ),
            (
                "hidalgo",
                [
                    45689.88,
                    87245789.45,
                    75600.84,
                    1540000.0,
                    562147892345.75,
                    957621384.34,
                    1247598.32,
                ],
                [45e3, 51e3, 63e3, 72e3, 78e3, 83e3, 91e3, 98e3, 104e3, 112e3],
                [95.0, 110.0, 125.0, 148.0, 163.0, 175.0, 190.0, 215.0, 230.0, 248.0],
            ),
        ];
        specs
            .into_iter()
            .map(|(region, totals, mxn, others)| {
                let record = CurrencyRecord {
                    totals: names
                        .iter()
                        .zip(totals)
                        .map(|((code, name), total)| CurrencyTotal {
                            total,
                            currency: code.to_string(),
                            name: name.to_string(),
                        })
                        .collect(),
                    trend: Some(CurrencyTrend {
                        periods: periods.clone(),
                        mxn: mxn.to_vec(),
                        others: others.to_vec(),
                    }),
                };
                (region.to_string(), record)
            })
            .collect()
    }

    /// Per-state map data plus a `NACIONAL` aggregate summing every state.
    pub fn map_dataset(&mut self) -> MapDataset {
        let mut ds = MapDataset::new();
        let mut national_methods = [0u64; 4];
        let mut national_count = 0;
        for (state, count) in STATE_COUNTS {
            let methods = self.split_methods(count);
            for (acc, m) in national_methods.iter_mut().zip(methods) {
                *acc += m;
            }
            national_count += count;
            let recent = self.recent_contracts(state, 5);
            ds.insert(
                state,
                MapStateRecord {
                    contracts: count,
                    methods: methods.to_vec(),
                    recent,
                },
            );
        }
        let recent = self.recent_contracts("CON", 5);
        ds.insert(
            "NACIONAL",
            MapStateRecord {
                contracts: national_count,
                methods: national_methods.to_vec(),
                recent,
            },
        );
        ds
    }

    /// `count` releases dated within two years of the anchor. Each carries
    /// one tender, one single-supplier award and the contract signed for it.
    pub fn release_package(&mut self, count: usize) -> ReleasePackage {
        let releases = (0..count)
            .map(|i| {
                let date = self.anchor - Duration::days(self.rng.gen_range(0..730));
                let signed = date + Duration::days(self.rng.gen_range(5..60));
                let method = pick(&mut self.rng, &METHODS);
                let details = method_label(&method).to_string();
                let supplier = self.rng.gen_range(0..SUPPLIERS.len());
                let value = Amount {
                    amount: f64::from(self.rng.gen_range(50_000u32..5_000_000)),
                    currency: Some("MXN".into()),
                };
                let award_id = format!("award-{:04}", i + 1);
                Release {
                    id: format!("ocds-mx-{:04}", i + 1),
                    date: Some(date.format("%Y-%m-%dT00:00:00Z").to_string()),
                    buyer: Some(Party {
                        id: String::new(),
                        name: pick(&mut self.rng, &BUYERS),
                    }),
                    tender: Some(Tender {
                        title: pick(&mut self.rng, &TITLES),
                        status: pick(&mut self.rng, &TENDER_STATUSES),
                        procurement_method: method,
                        procurement_method_details: details,
                        main_procurement_category: pick(&mut self.rng, &CATEGORIES),
                        value: Some(value.clone()),
                    }),
                    awards: vec![Award {
                        id: award_id.clone(),
                        status: "active".into(),
                        suppliers: vec![Party {
                            id: format!("SUP-{:03}", supplier + 1),
                            name: SUPPLIERS.get(supplier).copied().unwrap_or_default().into(),
                        }],
                        value: Some(value.clone()),
                    }],
                    contracts: vec![ReleaseContract {
                        id: format!("contract-{:04}", i + 1),
                        award_id,
                        status: pick(&mut self.rng, &STATUSES),
                        value: Some(value),
                        date_signed: Some(signed.format("%Y-%m-%d").to_string()),
                    }],
                }
            })
            .collect();
        ReleasePackage { releases }
    }

    fn split_methods(&mut self, count: u64) -> [u64; 4] {
        let open = count * self.rng.gen_range(35..=50) / 100;
        let selective = count * self.rng.gen_range(20..=30) / 100;
        let limited = count * self.rng.gen_range(5..=12) / 100;
        let direct = count - open - selective - limited;
        [open, selective, limited, direct]
    }

    fn recent_contracts(&mut self, state: &str, n: usize) -> Vec<RecentContract> {
        let code: String = state
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .collect();
        let base = self.rng.gen_range(100..200);
        (0..n)
            .map(|i| {
                let date = self.anchor - Duration::days(i as i64 * 3 + 1);
                RecentContract {
                    id: format!("{code}-2025-{:04}", base - i),
                    supplier: pick(&mut self.rng, &SUPPLIERS),
                    amount: f64::from(self.rng.gen_range(30u32..450)) * 5_000.0,
                    date: date.format("%d/%m/%Y").to_string(),
                    status: if self.rng.gen_bool(0.8) { "Activo" } else { "Pendiente" }.to_string(),
                }
            })
            .collect()
    }
}

fn pick(rng: &mut StdRng, from: &[&str]) -> String {
    from.choose(rng).copied().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> SampleGenerator {
        SampleGenerator::new(seed, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap())
    }

    #[test]
    fn same_seed_same_data() {
        assert_eq!(generator(7).contract_dataset(), generator(7).contract_dataset());
        assert_eq!(generator(7).map_dataset(), generator(7).map_dataset());
    }

    #[test]
    fn contracts_are_newest_first_and_in_range() {
        let cs = generator(1).contracts(30, "hidalgo");
        assert_eq!(cs.len(), 30);
        assert!(cs.windows(2).all(|w| w[0].date >= w[1].date));
        assert!(cs.iter().all(|c| c.id.starts_with("HID-2025-")));
        assert!(cs.iter().all(|c| (50_000.0..5_000_000.0).contains(&c.value)));
    }

    #[test]
    fn contract_dataset_has_all_regions() {
        let ds = generator(3).contract_dataset();
        let keys: Vec<&str> = ds.keys().collect();
        assert_eq!(keys, vec!["nacional", "hidalgo", "jalisco"]);
        let nac = ds.get("nacional").unwrap();
        assert_eq!(nac.stats.total, 1283);
        assert_eq!(nac.contracts.len(), 50);
    }

    #[test]
    fn map_national_sums_states() {
        let ds = generator(5).map_dataset();
        let nac = ds.get("NACIONAL").unwrap();
        let states: u64 = ds
            .iter()
            .filter(|(k, _)| *k != "NACIONAL")
            .map(|(_, r)| r.contracts)
            .sum();
        assert_eq!(nac.contracts, states);
        assert_eq!(nac.methods.iter().sum::<u64>(), states);
        assert!(ds.iter().all(|(_, r)| r.methods.len() == 4 && r.recent.len() == 5));
    }

    #[test]
    fn releases_link_contracts_to_awards() {
        let pkg = generator(4).release_package(25);
        assert_eq!(pkg.releases.len(), 25);
        assert_eq!(pkg, generator(4).release_package(25));
        for r in &pkg.releases {
            let contract = &r.contracts[0];
            assert_eq!(contract.award_id, r.awards[0].id);
            assert!(METHODS.contains(&r.tender.as_ref().unwrap().procurement_method.as_str()));
        }
    }

    #[test]
    fn supplier_shares_are_consistent() {
        let ds = generator(9).supplier_dataset();
        for (_, rec) in ds.iter() {
            let mc = &rec.market_concentration;
            let sum = mc.top10.value_percentage + mc.others.value_percentage;
            assert!((sum - 100.0).abs() < 1e-9);
            assert!(rec.top_suppliers.len() <= 8);
        }
    }
}
