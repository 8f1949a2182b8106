use crate::forecast::{CountryDetail, ForecastIndex, ForecastRecord, Period, SharedIndex};
use crate::map::{MapRenderer, Viewport};
use crate::route::Route;
use crate::ui;
use ratatui::layout::Rect;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Which forecasts color the map
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeriodMode {
    /// Each country's most recent forecast
    Latest,
    Fixed(Period),
}

/// What the map's shades encode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorScale {
    #[default]
    Risk,
    Fatalities,
}

impl ColorScale {
    pub fn toggle(self) -> Self {
        match self {
            ColorScale::Risk => ColorScale::Fatalities,
            ColorScale::Fatalities => ColorScale::Risk,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorScale::Risk => "risk",
            ColorScale::Fatalities => "fatalities",
        }
    }
}

/// Lower bounds of the fatality shades above the first
pub const FATALITY_STEPS: [f64; 3] = [1.0, 25.0, 250.0];

/// Shade for a predicted fatality count on a log-like step scale
pub fn fatality_shade(fatalities: f64) -> usize {
    FATALITY_STEPS.iter().filter(|&&step| fatalities >= step).count()
}

pub enum Screen {
    Map,
    Detail(Box<CountryDetail>),
    NotFound { code: String, period: Period },
}

/// Application state
pub struct App {
    shared: SharedIndex,
    index: Arc<ForecastIndex>,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    /// Inner map pane in terminal cells
    pub map_area: Rect,
    pub route: Route,
    pub screen: Screen,
    pub mode: PeriodMode,
    pub scale: ColorScale,
    /// Row selected in the country list
    pub list_selected: usize,
    /// Country under the mouse cursor
    pub hovered: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    dragged: bool,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// One-line message shown in the status bar
    pub status: Option<String>,
}

impl App {
    pub fn new(shared: SharedIndex, map_renderer: MapRenderer, width: u16, height: u16) -> Self {
        let map_area = ui::map_inner_area(Rect::new(0, 0, width, height));
        let index = shared.current();
        Self {
            shared,
            index,
            viewport: Viewport::africa(map_area.width as usize * 2, map_area.height as usize * 4),
            map_renderer,
            map_area,
            route: Route::Landing,
            screen: Screen::Map,
            mode: PeriodMode::Latest,
            scale: ColorScale::default(),
            list_selected: 0,
            hovered: None,
            should_quit: false,
            last_mouse: None,
            dragged: false,
            mouse_pos: None,
            status: None,
        }
    }

    pub fn index(&self) -> &ForecastIndex {
        &self.index
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_inner_area(Rect::new(0, 0, width, height));
        self.viewport.width = self.map_area.width as usize * 2;
        self.viewport.height = self.map_area.height as usize * 4;
    }

    pub fn reset_view(&mut self) {
        self.viewport = Viewport::africa(self.viewport.width, self.viewport.height);
    }

    /// Forecasts shown on the map for the current period mode
    pub fn map_forecasts(&self) -> BTreeMap<&str, &ForecastRecord> {
        match self.mode {
            PeriodMode::Latest => self.index.latest_forecast_for_map(),
            PeriodMode::Fixed(period) => self.index.period_forecasts(period),
        }
    }

    /// Shade of one forecast under the current color scale
    pub fn shade_of(&self, record: &ForecastRecord) -> usize {
        match self.scale {
            ColorScale::Risk => record.forecast.risk_category as usize,
            ColorScale::Fatalities => fatality_shade(record.forecast.predicted_fatalities),
        }
    }

    pub fn shade_by_country(&self) -> HashMap<&str, usize> {
        self.map_forecasts()
            .into_iter()
            .map(|(code, record)| (code, self.shade_of(record)))
            .collect()
    }

    pub fn toggle_scale(&mut self) {
        self.scale = self.scale.toggle();
        debug!("Map shaded by {}", self.scale.label());
    }

    /// Map forecasts ordered by predicted fatalities, highest first
    pub fn ranked_countries(&self) -> Vec<&ForecastRecord> {
        let mut ranked: Vec<&ForecastRecord> = self.map_forecasts().into_values().collect();
        ranked.sort_by(|a, b| {
            b.forecast
                .predicted_fatalities
                .total_cmp(&a.forecast.predicted_fatalities)
                .then_with(|| a.country_code.cmp(&b.country_code))
        });
        ranked
    }

    pub fn period_label(&self) -> String {
        match self.mode {
            PeriodMode::Latest => "Latest".to_string(),
            PeriodMode::Fixed(period) => period.label(),
        }
    }

    /// Start on a specific period if the dataset has it
    pub fn set_period(&mut self, period: Period) {
        if self.index.available_periods().contains(&period) {
            self.mode = PeriodMode::Fixed(period);
            self.list_selected = 0;
        } else {
            self.status = Some(format!("No forecasts for {}", period.label()));
        }
    }

    /// Cycle Latest -> first period -> ... -> last period -> Latest
    pub fn cycle_period(&mut self, forward: bool) {
        let mut options = vec![PeriodMode::Latest];
        options.extend(self.index.available_periods().into_iter().map(PeriodMode::Fixed));

        let n = options.len();
        let current = options.iter().position(|m| *m == self.mode).unwrap_or(0);
        let next = if forward { (current + 1) % n } else { (current + n - 1) % n };
        self.mode = options[next];
        self.list_selected = 0;
        debug!("Map period is now {}", self.period_label());
    }

    pub fn select_next(&mut self) {
        let len = self.map_forecasts().len();
        if len > 0 {
            self.list_selected = (self.list_selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.list_selected = self.list_selected.saturating_sub(1);
    }

    /// Open the detail view for the highlighted list entry
    pub fn open_selected(&mut self) {
        let route = self
            .ranked_countries()
            .get(self.list_selected)
            .map(|r| Route::country(r.country_code.clone(), r.period()));
        if let Some(route) = route {
            self.navigate(route);
        }
    }

    /// Open a country at the map's current period. In Latest mode that is
    /// the country's own most recent period.
    pub fn open_country(&mut self, code: &str) {
        let period = match self.mode {
            PeriodMode::Fixed(period) => Some(period),
            PeriodMode::Latest => self
                .index
                .country_forecasts(code)
                .last()
                .map(|r| r.period()),
        };
        // The selector value is the "{month}-{year}" form of the period
        match period.and_then(|p| Route::from_selection(code, &p.to_string())) {
            Some(route) => self.navigate(route),
            None => self.status = Some(format!("No forecasts for {}", code)),
        }
    }

    pub fn navigate(&mut self, route: Route) {
        info!("Navigating to {}", route);
        self.screen = match &route {
            Route::Landing => Screen::Map,
            Route::Country { code, period } => {
                match CountryDetail::build(&self.index, code, period.month, period.year) {
                    Some(detail) => Screen::Detail(Box::new(detail)),
                    None => Screen::NotFound {
                        code: code.clone(),
                        period: *period,
                    },
                }
            }
        };
        self.route = route;
    }

    pub fn back(&mut self) {
        self.navigate(Route::Landing);
    }

    /// Move the detail view to the country's next or previous period
    pub fn step_detail_period(&mut self, forward: bool) {
        let Screen::Detail(detail) = &self.screen else {
            return;
        };
        let next = detail
            .step_period(forward)
            .and_then(|period| self.route.with_period(period));
        if let Some(route) = next {
            self.navigate(route);
        }
    }

    /// Rebuild the index from disk; on failure the current data stays
    pub fn reload(&mut self) {
        match self.shared.reload() {
            Ok(index) => {
                self.index = index;
                if let PeriodMode::Fixed(period) = self.mode {
                    if !self.index.available_periods().contains(&period) {
                        self.mode = PeriodMode::Latest;
                    }
                }
                self.list_selected = 0;
                self.navigate(self.route.clone());
                self.status = Some(format!("Reloaded {} forecasts", self.index.len()));
            }
            Err(e) => {
                self.status = Some(format!("Reload failed: {}", e));
            }
        }
    }

    pub fn source_name(&self) -> String {
        self.shared.source().display().to_string()
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Terminal cell to braille pixel inside the map pane
    fn to_map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
            return None;
        }
        Some((((col - area.x) as i32) * 2, ((row - area.y) as i32) * 4))
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_map_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_map_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Country code under a terminal cell
    pub fn country_at(&self, col: u16, row: u16) -> Option<&str> {
        let (px, py) = self.to_map_pixel(col, row)?;
        let (lon, lat) = self.viewport.unproject(px, py);
        self.map_renderer.hit_test(lon, lat, self.viewport.zoom)
    }

    pub fn press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Drag pans the map
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - col as i32;
            let dy = last_y as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
            }
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((col, row));
    }

    /// Release without a drag is a click: open the country under the cursor
    pub fn release(&mut self, col: u16, row: u16) {
        let clicked = !self.dragged && self.last_mouse.is_some();
        self.last_mouse = None;
        self.dragged = false;
        if !clicked || !matches!(self.screen, Screen::Map) {
            return;
        }
        if let Some(code) = self.country_at(col, row).map(str::to_string) {
            self.open_country(&code);
        }
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.hovered = self.country_at(col, row).map(str::to_string);
    }

    /// Mouse position as a cell offset inside the map pane
    pub fn cursor_cell(&self) -> Option<(u16, u16)> {
        let (col, row) = self.mouse_pos?;
        self.to_map_pixel(col, row)
            .map(|(px, py)| ((px / 2) as u16, (py / 4) as u16))
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
