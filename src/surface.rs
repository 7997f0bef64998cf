// Render targets.
//
// A surface is whatever the views draw on: the terminal in the binary, an
// in-memory recorder in tests. Targets are addressed by id the same way the
// page addresses its elements.
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::chart::ChartConfig;
use crate::error::Result;
use crate::views::TablePage;

/// Header plus stringified rows, or a placeholder line when there is nothing
/// to list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableContent {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub placeholder: Option<String>,
    pub footer: Option<String>,
}

impl TableContent {
    pub fn from_rows<T: Tabled>(rows: &[T]) -> Self {
        Self {
            headers: T::headers().into_iter().map(|h| h.into_owned()).collect(),
            rows: rows
                .iter()
                .map(|r| r.fields().into_iter().map(|f| f.into_owned()).collect())
                .collect(),
            placeholder: None,
            footer: None,
        }
    }

    pub fn from_page<T: Tabled>(page: &TablePage<T>) -> Self {
        let mut content = Self::from_rows(&page.rows);
        content.placeholder = page.placeholder.clone();
        content.footer = Some(format!(
            "Página {} de {} ({} registros)",
            page.pagination.current, page.pagination.total_pages, page.total_items
        ));
        content
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn to_markdown(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.clone());
        match &self.placeholder {
            Some(text) if self.rows.is_empty() => {
                let mut row = vec![String::new(); self.headers.len().max(1)];
                row[0] = text.clone();
                builder.push_record(row);
            }
            _ => {
                for r in &self.rows {
                    builder.push_record(r.clone());
                }
            }
        }
        builder.build().with(Style::markdown()).to_string()
    }
}

pub trait RenderSurface {
    fn has_target(&self, id: &str) -> bool;

    /// `false` when no charting backend is available.
    fn has_renderer(&self) -> bool {
        true
    }

    fn draw_chart(&mut self, id: &str, config: &ChartConfig) -> Result<()>;

    fn set_text(&mut self, id: &str, text: &str) -> Result<()>;

    fn set_table(&mut self, id: &str, table: &TableContent) -> Result<()>;
}

/// Prints every update as markdown to a writer.
pub struct TerminalSurface<W: Write> {
    out: W,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[derive(Tabled)]
struct ChartPoint {
    #[tabled(rename = "Etiqueta")]
    label: String,
    #[tabled(rename = "Serie")]
    series: String,
    #[tabled(rename = "Valor")]
    value: String,
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn has_target(&self, _id: &str) -> bool {
        true
    }

    fn draw_chart(&mut self, id: &str, config: &ChartConfig) -> Result<()> {
        let points: Vec<ChartPoint> = config
            .series
            .iter()
            .flat_map(|s| {
                config.labels.iter().zip(&s.data).map(move |(l, v)| ChartPoint {
                    label: l.clone(),
                    series: s.label.clone(),
                    value: crate::util::format_number(*v, 2),
                })
            })
            .collect();
        writeln!(self.out, "\n[{id}] {:?}: {}", config.kind, config.title)?;
        if points.is_empty() {
            writeln!(self.out, "(sin datos)")?;
        } else {
            writeln!(self.out, "{}", Table::new(points).with(Style::markdown()))?;
        }
        Ok(())
    }

    fn set_text(&mut self, id: &str, text: &str) -> Result<()> {
        writeln!(self.out, "{id}: {text}")?;
        Ok(())
    }

    fn set_table(&mut self, id: &str, table: &TableContent) -> Result<()> {
        writeln!(self.out, "\n[{id}]\n{}", table.to_markdown())?;
        if let Some(footer) = &table.footer {
            writeln!(self.out, "{footer}")?;
        }
        Ok(())
    }
}

/// Keeps the last value written to each target.
#[derive(Debug, Default)]
pub struct MemorySurface {
    missing: BTreeSet<String>,
    renderer: bool,
    pub charts: BTreeMap<String, ChartConfig>,
    pub texts: BTreeMap<String, String>,
    pub tables: BTreeMap<String, TableContent>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            renderer: true,
            ..Self::default()
        }
    }

    /// Pretend the page has no element with this id.
    pub fn without_target(mut self, id: &str) -> Self {
        self.missing.insert(id.to_string());
        self
    }

    pub fn without_renderer(mut self) -> Self {
        self.renderer = false;
        self
    }
}

impl RenderSurface for MemorySurface {
    fn has_target(&self, id: &str) -> bool {
        !self.missing.contains(id)
    }

    fn has_renderer(&self) -> bool {
        self.renderer
    }

    fn draw_chart(&mut self, id: &str, config: &ChartConfig) -> Result<()> {
        self.charts.insert(id.to_string(), config.clone());
        Ok(())
    }

    fn set_text(&mut self, id: &str, text: &str) -> Result<()> {
        self.texts.insert(id.to_string(), text.to_string());
        Ok(())
    }

    fn set_table(&mut self, id: &str, table: &TableContent) -> Result<()> {
        self.tables.insert(id.to_string(), table.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::views::{table_page, StatCard};

    fn card(v: &str) -> StatCard {
        StatCard {
            target: "t".into(),
            label: "l".into(),
            value: v.into(),
        }
    }

    #[test]
    fn table_content_takes_tabled_headers() {
        let t = TableContent::from_rows(&[card("1"), card("2")]);
        assert_eq!(t.headers, vec!["Target", "Indicador", "Valor"]);
        assert_eq!(t.rows[1], vec!["t", "l", "2"]);
    }

    #[test]
    fn empty_page_renders_placeholder_row() {
        let empty: Vec<StatCard> = Vec::new();
        let page = table_page(&empty, 1, 10, |c: &StatCard| c.clone());
        let md = TableContent::from_page(&page).to_markdown();
        assert!(md.contains("No se encontraron resultados"));
    }

    #[test]
    fn terminal_prints_chart_points() {
        let mut term = TerminalSurface::new(Vec::new());
        let cfg = ChartConfig::new(ChartKind::Pie, "Estados")
            .labels(vec!["Activo".into()])
            .series("Contratos", vec![752.0]);
        term.draw_chart("contractStatusChart", &cfg).unwrap();
        let out = String::from_utf8(term.into_inner()).unwrap();
        assert!(out.contains("[contractStatusChart] Pie: Estados"));
        assert!(out.contains("752.00"));
    }
}
