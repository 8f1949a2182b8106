use anyhow::{Context, Result};
use clap::Parser;
use conflict_map::app::{App, Screen};
use conflict_map::config::Args;
use conflict_map::data;
use conflict_map::forecast::SharedIndex;
use conflict_map::map::MapRenderer;
use conflict_map::ui;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    // Fail before touching the terminal if the dataset is unusable
    let shared = SharedIndex::load(&args.data)
        .with_context(|| format!("loading forecasts from {}", args.data.display()))?;

    let mut map_renderer = MapRenderer::new();
    for (lod, shapes) in data::load_all_countries(&args.geo_dir) {
        map_renderer.add_countries(lod, shapes);
    }
    if !map_renderer.has_data() {
        info!("No country shapes under {}", args.geo_dir.display());
    }

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, shared, map_renderer, &args);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// The UI owns stdout, so logs only go to a file when one is given
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(
    terminal: &mut DefaultTerminal,
    shared: SharedIndex,
    map_renderer: MapRenderer,
    args: &Args,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(shared, map_renderer, size.width, size.height);
    info!(
        "Loaded {} forecasts for {} countries from {}",
        app.index().len(),
        app.index().all_countries().len(),
        app.source_name()
    );

    if let Some(period) = args.period {
        app.set_period(period);
    }
    if let Some(route) = args.route.clone() {
        app.navigate(route);
    }

    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if matches!(app.screen, Screen::Map) {
        handle_map_key(app, key.code);
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc | KeyCode::Backspace => app.back(),
        KeyCode::Char(']') | KeyCode::Right => app.step_detail_period(true),
        KeyCode::Char('[') | KeyCode::Left => app.step_detail_period(false),
        KeyCode::Char('R') => app.reload(),
        _ => {}
    }
}

fn handle_map_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Pan
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Char('j') => app.pan(0, 6),

        // Country list
        KeyCode::Up => app.select_prev(),
        KeyCode::Down => app.select_next(),
        KeyCode::Enter => app.open_selected(),

        // Period
        KeyCode::Char(']') => app.cycle_period(true),
        KeyCode::Char('[') => app.cycle_period(false),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layer toggles
        KeyCode::Char('s') => app.toggle_scale(),
        KeyCode::Char('f') => {
            let settings = &mut app.map_renderer.settings;
            settings.show_fill = !settings.show_fill;
        }
        KeyCode::Char('u') => {
            let settings = &mut app.map_renderer.settings;
            settings.show_unknown = !settings.show_unknown;
        }
        KeyCode::Char('L') => {
            let settings = &mut app.map_renderer.settings;
            settings.show_labels = !settings.show_labels;
        }

        KeyCode::Char('R') => app.reload(),
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
        _ => {}
    }
}

/// Scroll zooms, drag pans, click opens a country
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    if !matches!(app.screen, Screen::Map) {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.release(mouse.column, mouse.row),
        _ => {}
    }
}
