// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans the operations CSV, printing diagnostics.
// - Option [2] runs every aggregation, writes the report tables and a JSON
//   summary, then offers to go back to the menu.
// - `--batch` does both once without prompting.
use anyhow::{Context, Result};
use clap::Parser;
use cohesion_report::loader::{self, LoadReport};
use cohesion_report::settings::{Settings, DEFAULT_CONFIG_PATH};
use cohesion_report::{logging, output, reports, util, Operation};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::error;

#[derive(Parser)]
#[command(name = "cohesion_report")]
#[command(about = "Summary statistics of FEDER and FSE co-financed operations")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Operations CSV, overriding `data_path` from the configuration
    #[arg(long)]
    data: Option<String>,

    /// Load and generate once, without the interactive menu
    #[arg(long)]
    batch: bool,
}

// Loaded records are kept for the whole session so reports can be generated
// several times from a single load.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        settings: Settings::default(),
        data: None,
    })
});

struct AppState {
    settings: Settings,
    data: Option<Vec<Operation>>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn print_load_report(report: &LoadReport) {
    println!(
        "Processing dataset... ({} rows read, {} operations loaded)",
        util::format_int(report.total_rows),
        util::format_int(report.loaded_rows)
    );
    if report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            util::format_int(report.parse_errors)
        );
    }
    if report.skipped_funds > 0 {
        println!(
            "Note: {} rows skipped for funds other than FEDER/FSE.",
            util::format_int(report.skipped_funds)
        );
    }
    println!();
}

/// Option [1]: load the operations file into `APP_STATE`.
fn handle_load() -> Result<()> {
    let path = state().settings.data_path.clone();
    let (data, load_report) =
        loader::load_operations(&path).with_context(|| format!("failed to load {}", path))?;
    print_load_report(&load_report);
    state().data = Some(data);
    Ok(())
}

/// Option [2]: run every aggregation and write the outputs.
fn handle_generate_reports() -> Result<()> {
    let (data, settings) = {
        let state = state();
        (state.data.clone(), state.settings.clone())
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    };

    println!("Generating reports...\n");
    let report_set =
        reports::generate_all(&data, &settings).context("aggregation failed, no report written")?;
    output::write_reports(Path::new(&settings.output_dir), &report_set)
        .map_err(|e| anyhow::anyhow!("write error: {}", e))?;

    let summary = &report_set.summary;
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_operations\": {}, \"total_programmed\": {}, \"large_operations_amount_share\": {}}}\n",
        util::format_int(summary.total_operations),
        util::format_number(summary.total_programmed, 2),
        util::format_share(summary.large_operations_amount_share)
    );
    Ok(())
}

fn run_menu() {
    loop {
        println!("Cohesion funds report");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load() {
                    error!("Failed to load file: {:#}", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports() {
                    error!("Report generation failed: {:#}", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}

fn main() -> Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("invalid configuration in {}", cli.config))?;
    if let Some(data) = cli.data {
        settings.data_path = data;
    }
    state().settings = settings;

    if cli.batch {
        handle_load()?;
        handle_generate_reports()?;
        return Ok(());
    }
    run_menu();
    Ok(())
}
