// Dataset loading.
//
// Each view reads one JSON document, keyed by region except for the overview's
// release list. A document that cannot be
// read or parsed is replaced by generated sample data of the same shape, and
// the first successful load is kept for the rest of the session.
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{DashboardError, Result};
use crate::sample::SampleGenerator;
use crate::types::{
    ContractDataset, CurrencyDataset, InstitutionDataset, MapDataset, ReleasePackage,
    SupplierDataset,
};

/// Releases generated when the overview document is unavailable.
const SAMPLE_RELEASES: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Contracts,
    Suppliers,
    Institutions,
    Currencies,
    Map,
    /// Every release, filtered by the sidebar criteria rather than by region.
    Overview,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Contracts,
        DatasetKind::Suppliers,
        DatasetKind::Institutions,
        DatasetKind::Currencies,
        DatasetKind::Map,
        DatasetKind::Overview,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            DatasetKind::Contracts => "contracts",
            DatasetKind::Suppliers => "suppliers",
            DatasetKind::Institutions => "institutions",
            DatasetKind::Currencies => "currencies",
            DatasetKind::Map => "map",
            DatasetKind::Overview => "overview",
        }
    }

    /// Document name without the `.json` extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            DatasetKind::Contracts => "contract-data",
            DatasetKind::Suppliers => "supplier-data",
            DatasetKind::Institutions => "institution-data",
            DatasetKind::Currencies => "currency-data",
            DatasetKind::Map => "map-data",
            DatasetKind::Overview => "sample-data",
        }
    }
}

/// Where raw dataset documents come from.
pub trait DatasetSource {
    fn fetch(&self, name: &str) -> Result<String>;
}

/// Reads `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DatasetSource for FileSource {
    fn fetch(&self, name: &str) -> Result<String> {
        let path = self.dir.join(format!("{name}.json"));
        std::fs::read_to_string(&path).map_err(|e| DashboardError::Fetch {
            name: name.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Fetched,
    Sample,
}

#[derive(Debug, Clone)]
pub struct Loaded<D> {
    pub dataset: D,
    pub origin: Origin,
}

/// Fetch and parse `name`, or substitute `fallback()` with a warning.
pub fn load_or_sample<D, F>(source: &dyn DatasetSource, name: &str, fallback: F) -> Loaded<D>
where
    D: DeserializeOwned,
    F: FnOnce() -> D,
{
    let parsed = source.fetch(name).and_then(|raw| {
        serde_json::from_str::<D>(&raw).map_err(|e| DashboardError::Fetch {
            name: name.to_string(),
            reason: e.to_string(),
        })
    });
    match parsed {
        Ok(dataset) => {
            info!(dataset = name, "dataset loaded");
            Loaded {
                dataset,
                origin: Origin::Fetched,
            }
        }
        Err(e) => {
            warn!(dataset = name, error = %e, "using sample data");
            Loaded {
                dataset: fallback(),
                origin: Origin::Sample,
            }
        }
    }
}

/// Lazily loaded, session-long datasets. Each document is requested at most
/// once, on first access.
pub struct DatasetCache {
    source: Box<dyn DatasetSource>,
    samples: RefCell<SampleGenerator>,
    contracts: OnceCell<Loaded<ContractDataset>>,
    suppliers: OnceCell<Loaded<SupplierDataset>>,
    institutions: OnceCell<Loaded<InstitutionDataset>>,
    currencies: OnceCell<Loaded<CurrencyDataset>>,
    map: OnceCell<Loaded<MapDataset>>,
    releases: OnceCell<Loaded<ReleasePackage>>,
}

impl DatasetCache {
    pub fn new(source: Box<dyn DatasetSource>, samples: SampleGenerator) -> Self {
        Self {
            source,
            samples: RefCell::new(samples),
            contracts: OnceCell::new(),
            suppliers: OnceCell::new(),
            institutions: OnceCell::new(),
            currencies: OnceCell::new(),
            map: OnceCell::new(),
            releases: OnceCell::new(),
        }
    }

    fn load<D: DeserializeOwned>(
        &self,
        kind: DatasetKind,
        make: impl FnOnce(&mut SampleGenerator) -> D,
    ) -> Loaded<D> {
        load_or_sample(self.source.as_ref(), kind.file_stem(), || {
            make(&mut *self.samples.borrow_mut())
        })
    }

    pub fn contracts(&self) -> &Loaded<ContractDataset> {
        self.contracts
            .get_or_init(|| self.load(DatasetKind::Contracts, SampleGenerator::contract_dataset))
    }

    pub fn suppliers(&self) -> &Loaded<SupplierDataset> {
        self.suppliers
            .get_or_init(|| self.load(DatasetKind::Suppliers, SampleGenerator::supplier_dataset))
    }

    pub fn institutions(&self) -> &Loaded<InstitutionDataset> {
        self.institutions.get_or_init(|| {
            self.load(DatasetKind::Institutions, SampleGenerator::institution_dataset)
        })
    }

    pub fn currencies(&self) -> &Loaded<CurrencyDataset> {
        self.currencies
            .get_or_init(|| self.load(DatasetKind::Currencies, SampleGenerator::currency_dataset))
    }

    pub fn map(&self) -> &Loaded<MapDataset> {
        self.map
            .get_or_init(|| self.load(DatasetKind::Map, SampleGenerator::map_dataset))
    }

    pub fn releases(&self) -> &Loaded<ReleasePackage> {
        self.releases.get_or_init(|| {
            self.load(DatasetKind::Overview, |samples| {
                samples.release_package(SAMPLE_RELEASES)
            })
        })
    }

    pub fn is_loaded(&self, kind: DatasetKind) -> bool {
        match kind {
            DatasetKind::Contracts => self.contracts.get().is_some(),
            DatasetKind::Suppliers => self.suppliers.get().is_some(),
            DatasetKind::Institutions => self.institutions.get().is_some(),
            DatasetKind::Currencies => self.currencies.get().is_some(),
            DatasetKind::Map => self.map.get().is_some(),
            DatasetKind::Overview => self.releases.get().is_some(),
        }
    }
}

/// Ticket handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Orders overlapping requests so that only the most recently issued one may
/// apply its result. Anything that finishes after a newer request started is
/// dropped.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: Cell<u64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        let next = self.issued.get() + 1;
        self.issued.set(next);
        Ticket(next)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued.get()
    }

    /// `Some(value)` only when `ticket` is still the latest.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(ticket = ticket.0, latest = self.issued.get(), "discarding stale response");
            None
        }
    }
}
