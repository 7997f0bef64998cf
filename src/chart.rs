//! Declarative chart payloads and the slot that owns a live chart.
//!
//! The charting library is a sink: it receives a [`ChartConfig`] and draws it.
//! Nothing here knows about pixels or colours.

use serde::Serialize;
use tracing::debug;

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Pie,
    Doughnut,
    PolarArea,
    Bar,
    HorizontalBar,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisScale {
    Linear,
    Logarithmic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    /// Doughnut hole as a percentage; 0 draws a plain pie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutout: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_scale: Option<AxisScale>,
}

impl ChartConfig {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            labels: Vec::new(),
            series: Vec::new(),
            cutout: None,
            value_scale: None,
        }
    }

    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn series(mut self, label: impl Into<String>, data: Vec<f64>) -> Self {
        self.series.push(Series {
            label: label.into(),
            data,
        });
        self
    }

    pub fn cutout(mut self, pct: u8) -> Self {
        self.cutout = Some(pct);
        self
    }

    pub fn scale(mut self, scale: AxisScale) -> Self {
        self.value_scale = Some(scale);
        self
    }
}

/// What happened to a slot on [`ChartSlot::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    Created,
    UpdatedInPlace,
    Rebuilt,
}

/// Holder for the single live chart bound to one render target.
///
/// A second `init` while a chart is live is refused; `update` mutates the live
/// chart when the kind is unchanged and tears it down otherwise.
#[derive(Debug, Default)]
pub struct ChartSlot {
    target: String,
    live: Option<ChartConfig>,
    generation: u64,
}

impl ChartSlot {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            live: None,
            generation: 0,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn current(&self) -> Option<&ChartConfig> {
        self.live.as_ref()
    }

    /// Number of times a chart has been constructed in this slot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn init(&mut self, config: ChartConfig) -> Result<()> {
        if self.live.is_some() {
            return Err(DashboardError::SlotBusy(self.target.clone()));
        }
        self.live = Some(config);
        self.generation += 1;
        Ok(())
    }

    /// Bring the slot to `config`. New charts always go through
    /// [`init`](Self::init), so a slot never holds two live charts.
    pub fn update(&mut self, config: ChartConfig) -> Result<SlotChange> {
        match self.live.as_mut() {
            None => {
                self.init(config)?;
                Ok(SlotChange::Created)
            }
            Some(live) if live.kind == config.kind => {
                *live = config;
                Ok(SlotChange::UpdatedInPlace)
            }
            Some(_) => {
                debug!(target_id = %self.target, "chart kind changed, rebuilding");
                self.destroy();
                self.init(config)?;
                Ok(SlotChange::Rebuilt)
            }
        }
    }

    pub fn destroy(&mut self) {
        self.live = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pie() -> ChartConfig {
        ChartConfig::new(ChartKind::Pie, "status")
            .labels(vec!["a".into(), "b".into()])
            .series("count", vec![1.0, 2.0])
    }

    #[test]
    fn second_init_is_rejected() {
        let mut slot = ChartSlot::new("contractStatusChart");
        slot.init(pie()).unwrap();
        let err = slot.init(pie()).unwrap_err();
        assert!(matches!(err, DashboardError::SlotBusy(t) if t == "contractStatusChart"));
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn same_kind_updates_in_place() {
        let mut slot = ChartSlot::new("x");
        assert_eq!(slot.update(pie()).unwrap(), SlotChange::Created);
        let next = pie().series("extra", vec![3.0]);
        assert_eq!(slot.update(next.clone()).unwrap(), SlotChange::UpdatedInPlace);
        assert_eq!(slot.current(), Some(&next));
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn kind_change_rebuilds() {
        let mut slot = ChartSlot::new("x");
        slot.update(pie()).unwrap();
        let bar = ChartConfig::new(ChartKind::Bar, "status");
        assert_eq!(slot.update(bar).unwrap(), SlotChange::Rebuilt);
        assert_eq!(slot.generation(), 2);
        assert_eq!(slot.current().map(|c| c.kind), Some(ChartKind::Bar));
    }

    #[test]
    fn destroy_frees_the_slot() {
        let mut slot = ChartSlot::new("x");
        slot.init(pie()).unwrap();
        slot.destroy();
        assert!(!slot.is_live());
        assert!(slot.init(pie()).is_ok());
    }

    #[test]
    fn created_chart_blocks_a_second_init() {
        let mut slot = ChartSlot::new("currencyChart");
        assert_eq!(slot.update(pie()).unwrap(), SlotChange::Created);
        assert!(matches!(slot.init(pie()), Err(DashboardError::SlotBusy(_))));
        let bar = ChartConfig::new(ChartKind::Bar, "status");
        assert_eq!(slot.update(bar).unwrap(), SlotChange::Rebuilt);
        assert!(matches!(slot.init(pie()), Err(DashboardError::SlotBusy(_))));
        assert_eq!(slot.generation(), 2);
    }
}
