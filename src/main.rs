// Entry point and interactive menu.
//
// Every view is drawn on the terminal. The menu works on one active view at a
// time; switching views loads that view's dataset on first use.
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tabled::Tabled;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use procurement_dashboard::DashboardError;
use procurement_dashboard::config::{CliArgs, DashboardConfig};
use procurement_dashboard::dashboard::Dashboard;
use procurement_dashboard::loader::{DatasetKind, FileSource, Origin};
use procurement_dashboard::output;
use procurement_dashboard::overview::ReleaseFilter;
use procurement_dashboard::selector::{SortDirection, SortKey};
use procurement_dashboard::surface::TerminalSurface;
use procurement_dashboard::util::parse_date_safe;
use procurement_dashboard::views::{RankKey, TrendWindow};

#[derive(Clone, Tabled)]
struct SourceRow {
    #[tabled(rename = "Vista")]
    view: &'static str,
    #[tabled(rename = "Archivo")]
    file: String,
    #[tabled(rename = "Origen")]
    origin: &'static str,
}

struct Session {
    dash: Dashboard,
    surface: TerminalSurface<io::Stdout>,
    view: DatasetKind,
    config_path: PathBuf,
}

fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Read a single line after the common "Enter choice:" prompt.
fn read_choice() -> String {
    read_line("Enter choice: ")
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn choose_view() -> Option<DatasetKind> {
    println!("[1] Contratos  [2] Empresas  [3] Instituciones  [4] Monedas  [5] Mapa  [6] Resumen");
    match read_choice().as_str() {
        "1" => Some(DatasetKind::Contracts),
        "2" => Some(DatasetKind::Suppliers),
        "3" => Some(DatasetKind::Institutions),
        "4" => Some(DatasetKind::Currencies),
        "5" => Some(DatasetKind::Map),
        "6" => Some(DatasetKind::Overview),
        _ => None,
    }
}

/// Blank answers leave that filter unset.
fn read_optional(prompt: &str) -> Option<String> {
    Some(read_line(prompt)).filter(|s| !s.is_empty())
}

fn read_filter() -> ReleaseFilter {
    println!("Leave a field blank to skip it.");
    ReleaseFilter {
        institution: read_optional("Institución: "),
        year: read_optional("Año: "),
        method_details: read_optional("Tipo de procedimiento: "),
        supplier: read_optional("Proveedor: "),
        status: read_optional("Estatus: "),
        category: read_optional("Categoría: "),
        min_amount: read_optional("Monto mínimo: ").and_then(|s| s.parse().ok()),
        max_amount: read_optional("Monto máximo: ").and_then(|s| s.parse().ok()),
        date: parse_date_safe(read_optional("Fecha (AAAA-MM-DD): ").as_deref()),
    }
}

fn choose_sort() -> Option<(SortKey, SortDirection)> {
    println!("[1] Valor  [2] Contratos  [3] Valor por contrato  [4] Fecha");
    let key = match read_choice().as_str() {
        "1" => SortKey::Value,
        "2" => SortKey::Contracts,
        "3" => SortKey::ValuePerContract,
        "4" => SortKey::Date,
        _ => return None,
    };
    let direction = match read_line("Ascending or descending (A/D): ")
        .to_uppercase()
        .as_str()
    {
        "A" => SortDirection::Ascending,
        _ => SortDirection::Descending,
    };
    Some((key, direction))
}

fn handle_toggle(session: &mut Session) {
    let dash = &mut session.dash;
    match session.view {
        DatasetKind::Suppliers => {
            println!("[1] Valor/contratos  [2] Ranking por monto");
            println!("[3] Ranking por contratos  [4] Ranking por promedio");
            match read_choice().as_str() {
                "1" => {
                    dash.toggle_concentration();
                }
                "2" => dash.set_supplier_rank(RankKey::Value),
                "3" => dash.set_supplier_rank(RankKey::Contracts),
                "4" => dash.set_supplier_rank(RankKey::ValuePerContract),
                _ => println!("Invalid choice."),
            }
        }
        DatasetKind::Institutions => {
            println!("[1] Pastel/dona  [2] Ranking por contratos  [3] por monto");
            match read_choice().as_str() {
                "1" => {
                    dash.toggle_institution_chart();
                }
                "2" => dash.set_institution_rank(RankKey::Contracts),
                "3" => dash.set_institution_rank(RankKey::Value),
                _ => println!("Invalid choice."),
            }
        }
        DatasetKind::Currencies => {
            let scale = dash.toggle_currency_scale();
            info!(?scale, "currency scale changed");
        }
        DatasetKind::Overview => dash.set_overview_filter(read_filter()),
        DatasetKind::Contracts | DatasetKind::Map => println!("This view has no chart toggles."),
    }
}

fn handle_export(session: &mut Session) {
    let dir = session.dash.config().export_dir.clone();
    match session.dash.export_csv(session.view, &dir) {
        Ok(path) => println!("(Exported to {})\n", path.display()),
        Err(e) => eprintln!("Export failed: {e}\n"),
    }
}

fn handle_save_charts(session: &Session) {
    let path = session.dash.config().export_dir.join("charts.json");
    match output::write_json(&path, &session.dash.live_charts()) {
        Ok(()) => println!("(Chart configs saved to {})\n", path.display()),
        Err(e) => eprintln!("Write error: {e}\n"),
    }
}

fn handle_sources(session: &Session) {
    let dir = session.dash.config().data_dir.clone();
    let rows: Vec<SourceRow> = DatasetKind::ALL
        .into_iter()
        .map(|kind| SourceRow {
            view: kind.slug(),
            file: dir.join(format!("{}.json", kind.file_stem())).display().to_string(),
            origin: match session.dash.origin(kind) {
                Origin::Fetched => "archivo",
                Origin::Sample => "datos de muestra",
            },
        })
        .collect();
    output::preview_table_rows(&rows, rows.len());
}

fn handle_theme(session: &mut Session) {
    let cfg = session.dash.config_mut();
    cfg.theme = cfg.theme.cycle();
    let theme = cfg.theme;
    match DashboardConfig::persist_theme(&session.config_path, theme) {
        Ok(()) => println!("Theme set to {theme:?}.\n"),
        Err(e) => warn!(error = %e, "could not persist theme"),
    }
}

fn handle_region(session: &mut Session) {
    let name = read_line("Region: ");
    let result = if session.view == DatasetKind::Map {
        session.dash.click_state(&name).map(|state| {
            println!("Selected: {}", state.as_deref().unwrap_or("Nacional"));
        })
    } else {
        session.dash.select_region(session.view, &name)
    };
    if let Err(e) = result {
        println!("{e}\n");
    }
}

fn print_menu(session: &mut Session) {
    let region = session.dash.current_region(session.view).unwrap_or_default();
    println!("\nView: {} (region {region})", session.view.slug());
    println!("[1] Switch view        [2] Select region     [3] Clear selection");
    println!("[4] Search             [5] Sort              [6] Next page");
    println!("[7] Previous page      [8] Chart toggles     [9] Trend window");
    println!("[10] Export CSV        [11] Save charts      [12] Data sources");
    println!("[13] Cycle theme       [14] Hover state      [15] Leave map");
    println!("[0] Exit\n");
}

fn main() {
    init_tracing();
    let args = CliArgs::parse();
    let mut config = DashboardConfig::load(&args.config).unwrap_or_else(|e| {
        error!(error = %e, "invalid config, using defaults");
        DashboardConfig::default()
    });
    config.apply_args(&args);

    let source = FileSource::new(config.data_dir.clone());
    let mut session = Session {
        dash: Dashboard::new(config, Box::new(source)),
        surface: TerminalSurface::stdout(),
        view: DatasetKind::Contracts,
        config_path: args.config.clone(),
    };
    session.dash.refresh(&mut session.surface, session.view);

    loop {
        print_menu(&mut session);
        let view = session.view;
        let outcome: Result<(), DashboardError> = match read_choice().as_str() {
            "0" => {
                println!("Exiting the program.");
                break;
            }
            "1" => {
                match choose_view() {
                    Some(v) => session.view = v,
                    None => println!("Invalid choice."),
                }
                Ok(())
            }
            "2" => {
                handle_region(&mut session);
                Ok(())
            }
            "3" => session.dash.clear_selection(view),
            "4" => {
                let term = read_line("Search: ");
                session.dash.search(view, &term).map(|hits| println!("{hits} result(s)"))
            }
            "5" => match choose_sort() {
                Some((key, dir)) => session.dash.sort(view, key, dir),
                None => Ok(()),
            },
            "6" => session.dash.next_page(view).map(|_| ()),
            "7" => session.dash.prev_page(view).map(|_| ()),
            "8" => {
                handle_toggle(&mut session);
                Ok(())
            }
            "9" => {
                let filter = read_line("Window (all, last3, last5, or a year): ");
                if !session.dash.set_trend_window(view, TrendWindow::parse(&filter)) {
                    println!("This view has no trend chart.");
                }
                Ok(())
            }
            "10" => {
                handle_export(&mut session);
                continue;
            }
            "11" => {
                handle_save_charts(&session);
                continue;
            }
            "12" => {
                handle_sources(&session);
                continue;
            }
            "13" => {
                handle_theme(&mut session);
                continue;
            }
            "14" => {
                let name = read_line("State: ");
                if !session.dash.hover_state(&name) {
                    println!("A state is selected; clear it first.");
                }
                session.view = DatasetKind::Map;
                Ok(())
            }
            "15" => {
                session.dash.leave_map();
                Ok(())
            }
            _ => {
                println!("Invalid choice. Please enter 0-15.\n");
                continue;
            }
        };
        if let Err(e) = outcome {
            println!("{e}\n");
        }
        session.dash.refresh(&mut session.surface, session.view);
    }
}
