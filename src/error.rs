use thiserror::Error;

/// Everything that can go wrong while loading a dataset or refreshing a view.
///
/// None of these are fatal: the dashboard logs them at the view boundary and
/// keeps the remaining views running.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("render target not found: #{0}")]
    MissingTarget(String),

    #[error("no chart renderer available")]
    MissingRenderer,

    #[error("failed to load dataset {name}: {reason}")]
    Fetch { name: String, reason: String },

    #[error("no data available for region: {0}")]
    NoRegionData(String),

    #[error("nothing to show for {0}")]
    EmptyDerived(String),

    #[error("the {0} view is not split by region")]
    NotRegional(String),

    #[error("select a {0} first")]
    NothingSelected(String),

    #[error("chart slot #{0} is already initialised")]
    SlotBusy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
