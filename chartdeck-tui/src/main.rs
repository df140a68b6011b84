use chartdeck::{
    refresh::RefreshEvent, spawn_refresh, DashboardConfig, HttpChartSource, JsonFileStore,
    Settings,
};
use chartdeck_tui::{ui, App};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{error::Error, fs::OpenOptions, io, path::Path, sync::Arc, sync::Mutex, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = DashboardConfig::from_env();
    init_logging(&config.log_path)?;
    info!(api_url = %config.api_url, ticker = %config.ticker, "starting chartdeck");

    let source = Arc::new(HttpChartSource::new(config.fetch_config()?)?);
    let (refresh, mut events) = spawn_refresh(source, config.debounce);
    let store = JsonFileStore::new(&config.prefs_path);
    let mut app = App::new(Settings::new(&config.ticker), Box::new(store), refresh);

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    app.on_resize(size.width, size.height);

    let res = run_app(&mut terminal, &mut app, &mut events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("chartdeck stopped");
    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut UnboundedReceiver<RefreshEvent>,
) -> io::Result<()> {
    let poll_interval = Duration::from_millis(50);

    loop {
        while let Ok(event) = events.try_recv() {
            app.on_refresh_event(event);
        }
        app.tick();

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(poll_interval)? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(width, height) => app.on_resize(width, height),
                _ => {}
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Log to a file: the terminal belongs to the UI.
fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
