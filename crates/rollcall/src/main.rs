use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use rollcall::{Config, DefaultApp, MarkOutcome};
use rollcall_hw::Camera;
use rollcall_store::Store;
use std::any::Any;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition employee attendance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the terminal UI (default)
    Ui,
    /// Register an employee from the face currently in front of the camera
    Register {
        /// Employee name (must be unique)
        #[arg(short, long)]
        name: String,
    },
    /// Mark attendance from the live feed without the UI, until Ctrl-C
    Live,
    /// List registered employees
    Employees,
    /// Remove an employee and their attendance history
    Remove {
        /// Employee name
        name: String,
    },
    /// Show recent attendance, newest first
    Attendance {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // Installed before the UI starts so ratatui's hook restores the terminal first.
    install_panic_hook();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error occurred: {e:#}");
            wait_for_enter();
            ExitCode::FAILURE
        }
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        eprintln!("Error occurred: {}", panic_message(info.payload()));
        wait_for_enter();
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn wait_for_enter() {
    if std::io::stdin().is_terminal() {
        eprintln!("Press Enter to exit...");
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let command = cli.command.unwrap_or(Commands::Ui);
    init_tracing(&config, matches!(command, Commands::Ui))?;

    match command {
        Commands::Ui => {
            let mut app = DefaultApp::open(&config)?;
            rollcall::ui::run(&mut app, &config).await?;
        }
        Commands::Register { name } => {
            let mut app = DefaultApp::open(&config)?;
            let reg = app.register(&name)?;
            println!("Employee '{}' registered successfully (id {})", reg.name, reg.id);
        }
        Commands::Live => live(&config).await?,
        Commands::Employees => {
            let store = Store::open(&config.db_path)?;
            let employees = store.employees()?;
            if employees.is_empty() {
                println!("No employees registered");
            }
            for employee in employees {
                println!("{:>4}  {}", employee.id, employee.name);
            }
        }
        Commands::Remove { name } => {
            let store = Store::open(&config.db_path)?;
            if store.remove_employee(&name)? {
                println!("Removed employee '{name}'");
            } else {
                anyhow::bail!("no employee named '{name}'");
            }
        }
        Commands::Attendance { limit, json } => {
            let store = Store::open(&config.db_path)?;
            let rows = store.recent_attendance(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No attendance recorded");
            } else {
                for row in rows {
                    let location = match (row.record.latitude, row.record.longitude) {
                        (Some(lat), Some(lon)) => format!("{lat:.4},{lon:.4}"),
                        _ => "-".to_string(),
                    };
                    println!(
                        "{:>6}  {}  {:<20}  {}",
                        row.record.id, row.record.timestamp, row.name, location
                    );
                }
            }
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
    }

    Ok(())
}

/// Headless live loop: same tick as the UI, results go to stdout.
async fn live(config: &Config) -> Result<()> {
    let mut app = DefaultApp::open(config)?;
    let mut interval = tokio::time::interval(config.live_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("Marking attendance; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let frame = match app.live_tick(Local::now()).await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "live recognition failed");
                        continue;
                    }
                };
                for mark in frame.marks {
                    match mark {
                        MarkOutcome::Marked(m) => {
                            println!("Marked: {} at {}", m.name, m.timestamp.format("%H:%M:%S"));
                        }
                        MarkOutcome::WriteFailed { name, error, .. } => {
                            eprintln!("Failed to save attendance for {name}: {error}");
                        }
                        MarkOutcome::CoolingDown => {}
                    }
                }
                let unknown = frame.faces.iter().filter(|f| !f.is_known()).count();
                if unknown > 0 {
                    tracing::debug!(unknown, "unrecognized faces in frame");
                }
            }
        }
    }
    Ok(())
}

fn init_tracing(config: &Config, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if to_file {
        if let Some(parent) = config.log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_path)
            .with_context(|| format!("failed to open log file {}", config.log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
