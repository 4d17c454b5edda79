// Entry point and interactive dashboard flow.
//
// - Option [1] loads the indicator workbook (memoized by file identity) and
//   prints load diagnostics.
// - Option [2] walks the three filters (year, service, characteristic),
//   renders the indicator report and offers the export.
// - Option [3] drops the cached dataset and loads the source again.
mod compliance;
mod config;
mod dataset;
mod error;
mod export;
mod filter;
mod loader;
mod output;
mod period;
mod reports;
mod target;
mod types;
mod util;

use config::AppConfig;
use dataset::IndicatorDataset;
use error::AppError;
use filter::FilterState;
use loader::DatasetCache;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Everything one dashboard session needs. Recomputation reads the dataset
/// through `cache`; nothing else is shared between interactions.
struct Session {
    config: AppConfig,
    cache: DatasetCache,
    filters: Option<FilterState>,
}

/// Print `prompt` and read one trimmed line. `None` once stdin is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask a yes/no question. Returns `None` once stdin is closed.
fn prompt_yes_no(question: &str) -> Option<bool> {
    loop {
        let resp = read_line(&format!("{} (S/N): ", question))?.to_uppercase();
        match resp.as_str() {
            "S" => return Some(true),
            "N" => return Some(false),
            _ => println!("Opción inválida. Ingrese S o N."),
        }
    }
}

/// Numbered option list. An empty answer keeps `current`.
fn prompt_option<T: std::fmt::Display>(title: &str, options: &[T], current: usize) -> Option<usize> {
    println!("{}", title);
    for (i, opt) in options.iter().enumerate() {
        let mark = if i == current { "*" } else { " " };
        println!("{}[{}] {}", mark, i + 1, opt);
    }
    loop {
        let resp = read_line("Ingrese opción (Enter = actual): ")?;
        if resp.is_empty() {
            return Some(current);
        }
        match resp.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
            _ => println!("Opción inválida. Ingrese un número entre 1 y {}.", options.len()),
        }
    }
}

fn handle_load(session: &mut Session) {
    match session.cache.get_or_load(&session.config.source) {
        Ok(loaded) => {
            debug!(reads = session.cache.loads(), "source reads so far");
            output::print_load_report(&loaded.report);
            let keep = session
                .filters
                .as_ref()
                .map_or(false, |f| f.selection().is_some());
            if !keep {
                session.filters = Some(FilterState::new(&loaded.dataset));
            }
        }
        Err(e) => {
            error!(error = %e, "load failed");
            eprintln!("No se pudo cargar el archivo: {}\n", e);
        }
    }
}

fn handle_reload(session: &mut Session) {
    session.cache.invalidate();
    session.filters = None;
    handle_load(session);
}

fn current_dataset(session: &mut Session) -> Result<Arc<IndicatorDataset>, AppError> {
    if session.cache.cached().is_none() {
        return Err(AppError::NoDataLoaded);
    }
    // A modified source file is picked up here.
    Ok(session.cache.get_or_load(&session.config.source)?.dataset)
}

/// Walk the filters. `None` when stdin closes or nothing is selectable.
fn choose_selection(dataset: &IndicatorDataset, state: &mut FilterState) -> Option<filter::Selection> {
    let years = dataset.years_desc();
    if years.is_empty() {
        output::print_notice("No hay años con mediciones.");
    } else {
        let current = state
            .year
            .and_then(|y| years.iter().position(|v| *v == y))
            .unwrap_or(0);
        let idx = prompt_option("Selecciona el Año:", &years, current)?;
        state.set_year(years[idx]);
    }

    let services = dataset.services();
    if services.is_empty() {
        output::print_notice("No hay servicios definidos.");
        return None;
    }
    let current = state
        .service
        .as_ref()
        .and_then(|s| services.iter().position(|v| v == s))
        .unwrap_or(0);
    let idx = prompt_option("Selecciona el Servicio:", &services, current)?;
    state.set_service(dataset, &services[idx]);

    let characteristics = state.characteristic_options(dataset);
    if !characteristics.is_empty() {
        let current = state
            .characteristic
            .as_ref()
            .and_then(|c| characteristics.iter().position(|v| v == c))
            .unwrap_or(0);
        let idx = prompt_option("Selecciona la Característica:", &characteristics, current)?;
        state.set_characteristic(dataset, &characteristics[idx]);
    }

    state.selection()
}

/// Returns `false` when the user wants to leave.
fn handle_view(session: &mut Session) -> bool {
    let dataset = match current_dataset(session) {
        Ok(ds) => ds,
        Err(AppError::NoDataLoaded) => {
            println!("Error: no hay datos cargados. Cargue el archivo primero (opción 1).\n");
            return true;
        }
        Err(e) => {
            eprintln!("No se pudo leer el archivo: {}\n", e);
            return true;
        }
    };
    let state = session
        .filters
        .get_or_insert_with(|| FilterState::new(&dataset));

    let Some(selection) = choose_selection(&dataset, state) else {
        warn!("no complete selection");
        return true;
    };
    println!();
    let report = reports::report_for(&dataset, &selection);
    output::print_report(&report);

    if !report.export_table().is_empty() {
        match prompt_yes_no("¿Descargar datos como Excel?") {
            Some(true) => match export::export_report(&report, &session.config.export_dir) {
                Ok(files) => println!(
                    "Datos exportados a {} (también {} y {})\n",
                    files.xlsx.display(),
                    files.csv.display(),
                    files.json.display()
                ),
                Err(e) => eprintln!("Error al exportar: {}\n", e),
            },
            Some(false) => {}
            None => return false,
        }
    }

    prompt_yes_no("¿Volver a la selección?").unwrap_or(false)
}

fn main() {
    let config = AppConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(io::stderr)
        .init();

    let mut session = Session {
        config,
        cache: DatasetCache::new(),
        filters: None,
    };

    loop {
        println!("Indicadores de Acreditación");
        println!("[1] Cargar el archivo");
        println!("[2] Ver indicador");
        println!("[3] Recargar datos\n");
        let Some(choice) = read_line("Ingrese opción: ") else {
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session),
            "2" => {
                println!();
                if !handle_view(&mut session) {
                    println!("Saliendo del programa.");
                    break;
                }
            }
            "3" => handle_reload(&mut session),
            _ => println!("Opción inválida. Ingrese 1, 2 o 3.\n"),
        }
    }
}
