use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use perfmon_dash::bus::{self, BusEvent, SubscriberId};
use perfmon_dash::events;
use perfmon_dash::ui::{self, DashboardView, Theme};
use perfmon_dash::{
    App, DataSource, FileSource, HttpSource, PollPayload, Settings, Store, StreamSource,
};

#[derive(Parser, Debug)]
#[command(name = "perfmon-dash")]
#[command(about = "Terminal dashboard for perfmon host and process metrics")]
struct Args {
    /// perfmon endpoint to poll (overrides `endpoint` from config)
    #[arg(short, long, conflicts_with_all = ["file", "connect"])]
    url: Option<String>,

    /// Read payloads from a JSON file, re-read when it changes
    #[arg(short, long, conflicts_with_all = ["url", "connect"])]
    file: Option<PathBuf>,

    /// Read newline-delimited JSON payloads from a TCP endpoint (host:port)
    #[arg(short, long, conflicts_with_all = ["url", "file"])]
    connect: Option<String>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll interval in milliseconds (overrides `poll_interval_ms`)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Poll once, write the dashboard table as JSON and exit
    #[arg(short, long, conflicts_with = "connect")]
    export: Option<PathBuf>,

    /// Write logs to this file (`RUST_LOG` sets the filter)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(ref path) = args.log_file {
        init_logging(path)?;
    }

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(ref url) = args.url {
        settings.endpoint = url.clone();
    }
    if let Some(ms) = args.interval {
        anyhow::ensure!(ms > 0, "--interval must be greater than zero");
        settings.poll_interval_ms = ms;
    }
    info!(endpoint = %settings.endpoint, interval_ms = settings.poll_interval_ms, "starting");

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_to_file(args.file.as_deref(), export_path, &settings);
    }

    let rt = tokio::runtime::Runtime::new()?;

    let source: Box<dyn DataSource> = if let Some(ref addr) = args.connect {
        Box::new(connect_tcp(&rt, addr)?)
    } else if let Some(ref path) = args.file {
        Box::new(FileSource::new(path))
    } else {
        let _guard = rt.enter();
        Box::new(HttpSource::spawn(
            &settings.endpoint,
            settings.poll_interval(),
            settings.request_timeout(),
        )?)
    };

    let result = run_tui(source, &settings);

    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Send logs to `path`; the terminal belongs to the TUI.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("perfmon_dash=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}

/// Connect to a TCP endpoint streaming newline-delimited payloads
fn connect_tcp(rt: &tokio::runtime::Runtime, addr: &str) -> Result<StreamSource> {
    rt.block_on(async {
        use tokio::net::TcpStream;

        println!("Connecting to {}...", addr);
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;
        println!("Connected!");
        Ok(StreamSource::spawn(stream, addr))
    })
}

/// Run the TUI with the given data source
fn run_tui(source: Box<dyn DataSource>, settings: &Settings) -> Result<()> {
    let mut app = App::new(source)
        .with_rule(settings.severity_rule())
        .with_labels(settings.labels())
        .with_viewer_options(settings.viewer_options())
        .with_theme(Theme::auto_detect());
    subscribe_logger(&mut app);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    app.reload_data();

    // Run the main loop
    let result = run_app(&mut terminal, &mut app, settings.poll_interval());

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Log bus traffic at debug level.
fn subscribe_logger(app: &mut App) {
    let id = SubscriberId::next();
    for event in [bus::STORE_INGESTED, bus::VIEWER_OPENED, bus::VIEWER_CLOSED] {
        app.bus_mut().subscribe(event, id, move |data: &BusEvent| {
            debug!(event, subscriber = %id, ?data, "bus event");
            Ok(())
        });
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    // Sources push results as they arrive; drain them often, but never
    // less often than the poll interval.
    let drain_interval = refresh_interval.min(Duration::from_millis(250));

    while app.running {
        terminal.draw(|frame| {
            let area = frame.area();
            app.frame_area = area;

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                ui::common::render_too_small(frame, area, MIN_WIDTH, MIN_HEIGHT);
                return;
            }

            ui::draw(frame, app);
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
                _ => {}
            }
        }

        if last_refresh.elapsed() >= drain_interval {
            app.reload_data();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}

/// Poll once, build the dashboard table and write it as JSON
fn export_to_file(file: Option<&Path>, export_path: &Path, settings: &Settings) -> Result<()> {
    let payload: PollPayload = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(HttpSource::fetch_once(
                &settings.endpoint,
                settings.request_timeout(),
            ))
            .with_context(|| format!("failed to poll {}", settings.endpoint))?
        }
    };

    let mut store = Store::new();
    let report = store.ingest(&payload);
    let table = DashboardView::build(&store, &settings.severity_rule(), &settings.labels());

    let json = serde_json::to_string_pretty(&table.to_json())?;
    std::fs::write(export_path, json)?;

    println!(
        "Exported {} rows ({} points) to: {}",
        table.rows.len(),
        report.points,
        export_path.display()
    );
    Ok(())
}
