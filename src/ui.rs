use crate::app::{App, ColorScale, Screen, FATALITY_STEPS};
use crate::braille::BrailleCanvas;
use crate::forecast::detail::{Band, CountryDetail, Trend, TrendPoint};
use crate::forecast::{Period, RiskCategory};
use crate::map::{draw_line, MapLayers, SHADES};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};

const SIDE_PANEL_WIDTH: u16 = 36;
const ORANGE: Color = Color::Rgb(255, 165, 0);

/// Colors of the map shades, lightest first
const SHADE_COLORS: [Color; SHADES] = [Color::LightBlue, Color::Yellow, ORANGE, Color::Red];

pub fn risk_color(category: RiskCategory) -> Color {
    SHADE_COLORS[category as usize]
}

fn band_color(band: Band) -> Color {
    match band {
        Band::Low => Color::LightBlue,
        Band::Elevated => Color::Yellow,
        Band::High => ORANGE,
        Band::Critical => Color::Red,
    }
}

/// Split the screen into body and status bar
fn screen_chunks(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    (chunks[0], chunks[1])
}

/// Split the map screen body into the map pane and the country list
fn map_chunks(body: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(body);
    (chunks[0], chunks[1])
}

/// Inner (borderless) map pane for a full terminal area. Mouse handling
/// uses this to translate cells to map pixels.
pub fn map_inner_area(area: Rect) -> Rect {
    let (body, _) = screen_chunks(area);
    let (map, _) = map_chunks(body);
    Block::default().borders(Borders::ALL).inner(map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let (body, status) = screen_chunks(frame.area());

    match &app.screen {
        Screen::Map => render_map_screen(frame, app, body),
        Screen::Detail(detail) => render_detail(frame, detail, body),
        Screen::NotFound { code, period } => render_not_found(frame, code, *period, body),
    }
    render_status_bar(frame, app, status);
}

fn render_map_screen(frame: &mut Frame, app: &App, area: Rect) {
    let (map_area, side) = map_chunks(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(
                " Conflict Forecasts | {} | by {} ",
                app.period_label(),
                app.scale.label()
            ),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(map_area);
    frame.render_widget(block, map_area);

    if !app.map_renderer.has_data() {
        let notice = Paragraph::new(vec![
            Line::from("No country shapes loaded."),
            Line::from("Put ne_110m_admin_0_countries.json in the --geo-dir directory."),
            Line::from("The country list on the right still works."),
        ])
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
        frame.render_widget(notice, inner);
    } else {
        let mut viewport = app.viewport.clone();
        // Braille gives 2x4 resolution per character
        viewport.width = inner.width as usize * 2;
        viewport.height = inner.height as usize * 4;

        let shades = app.shade_by_country();
        let selected = app
            .ranked_countries()
            .get(app.list_selected)
            .copied()
            .map(|r| r.country_code.as_str());
        let layers = app.map_renderer.render(
            inner.width as usize,
            inner.height as usize,
            &viewport,
            &shades,
            selected,
        );

        frame.render_widget(
            MapWidget {
                layers,
                cursor_pos: app.cursor_cell(),
            },
            inner,
        );
    }

    render_side_panel(frame, app, side);
}

/// Custom widget that renders braille map layers with text labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

/// Copy non-blank braille cells into the buffer in one color
fn render_canvas(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
    for (col, row, ch) in canvas.cells() {
        if col >= area.width as usize || row >= area.height as usize {
            continue;
        }
        buf[(area.x + col as u16, area.y + row as u16)]
            .set_char(ch)
            .set_fg(color);
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: countries without data, then by rising severity
        render_canvas(&self.layers.unknown, Color::DarkGray, area, buf);
        for (canvas, color) in self.layers.shades.iter().zip(SHADE_COLORS) {
            render_canvas(canvas, color, area, buf);
        }
        render_canvas(&self.layers.selected, Color::White, area, buf);

        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let max_len = (area.width - *lx) as usize;
            for (i, ch) in text.chars().take(max_len).enumerate() {
                buf[(area.x + *lx + i as u16, area.y + *ly)]
                    .set_char(ch)
                    .set_style(label_style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(7)])
        .split(area);

    let ranked = app.ranked_countries();
    let items: Vec<ListItem> = ranked
        .iter()
        .map(|r| {
            let color = SHADE_COLORS[app.shade_of(r)];
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<4}", r.country_code), Style::default().fg(color)),
                Span::raw(format!("{:<18.18}", r.country_name)),
                Span::styled(
                    format!("{:>9.1}", r.forecast.predicted_fatalities),
                    Style::default().fg(color),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Predicted fatalities "),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    if !ranked.is_empty() {
        state.select(Some(app.list_selected.min(ranked.len() - 1)));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let mut legend: Vec<Line> = legend_labels(app.scale)
        .into_iter()
        .enumerate()
        .rev()
        .map(|(shade, label)| {
            Line::from(vec![
                Span::styled("■ ", Style::default().fg(SHADE_COLORS[shade])),
                Span::raw(label),
            ])
        })
        .collect();
    legend.push(Line::from(vec![
        Span::styled("■ ", Style::default().fg(Color::DarkGray)),
        Span::raw("No forecast"),
    ]));
    let legend = Paragraph::new(legend).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(match app.scale {
                ColorScale::Risk => " Risk ",
                ColorScale::Fatalities => " Predicted fatalities ",
            }),
    );
    frame.render_widget(legend, chunks[1]);
}

/// Legend text per shade, lightest first
fn legend_labels(scale: ColorScale) -> Vec<String> {
    match scale {
        ColorScale::Risk => RiskCategory::ALL.iter().map(|c| c.label().to_string()).collect(),
        ColorScale::Fatalities => {
            let [low, mid, high] = FATALITY_STEPS;
            vec![
                format!("under {low}"),
                format!("{low} to {mid}"),
                format!("{mid} to {high}"),
                format!("{high} or more"),
            ]
        }
    }
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_detail(frame: &mut Frame, detail: &CountryDetail, area: Rect) {
    let record = &detail.record;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Percentage(50),
            Constraint::Percentage(50),
        ])
        .split(area);

    // Header: title plus the period selector
    let mut selector = vec![Span::styled("Period: ", Style::default().fg(Color::DarkGray))];
    for option in &detail.period_options {
        let style = if option.period == detail.period() {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Cyan)
        };
        selector.push(Span::styled(format!(" {} ", option.label), style));
        selector.push(Span::raw(" "));
    }
    let mut title = vec![Span::styled(
        format!("{}, {}", record.country_name, detail.period().label()),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(option) = detail.selected_option() {
        title.push(Span::styled(
            format!("  [{}]", option.value),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let header = Paragraph::new(vec![
        Line::from(title),
        Line::from(selector),
    ]);
    frame.render_widget(header, rows[0]);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    // Summary
    let color = risk_color(record.forecast.risk_category);
    let mut summary = vec![
        Line::from(vec![
            Span::styled(record.forecast.risk_category.label(), Style::default().fg(color)),
            Span::raw(format!(
                "  |  predicted fatalities {:.1}",
                record.forecast.predicted_fatalities
            )),
        ]),
        Line::from(""),
        Line::from(record.bluf.as_str()),
    ];
    if let Some(cohort) = &record.cohort {
        summary.push(Line::from(""));
        summary.push(Line::from(Span::styled(
            format!("Cohort: {}", cohort),
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(
        Paragraph::new(summary)
            .wrap(Wrap { trim: true })
            .block(panel("Summary")),
        top[0],
    );

    // Violence trend
    let trend_block = panel("Violence trend");
    let trend_inner = trend_block.inner(top[1]);
    frame.render_widget(trend_block, top[1]);
    render_trend(frame, &detail.trend, trend_inner);

    // Structural risk factors
    let covariates_block = panel("Structural risk factors");
    let cov_inner = covariates_block.inner(bottom[0]);
    frame.render_widget(covariates_block, bottom[0]);
    render_covariates(frame, detail, cov_inner);

    // Comparable cases
    render_peers(frame, detail, bottom[1]);
}

fn render_trend(frame: &mut Frame, trend: &Trend, area: Rect) {
    if trend.history.is_empty() && trend.forecasts.is_empty() {
        frame.render_widget(
            Paragraph::new("No historical data").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(2)])
        .split(area);

    frame.render_widget(TrendWidget { trend }, chunks[0]);

    let mut legend = vec![
        Span::styled("── history ", Style::default().fg(Color::Gray)),
        Span::styled("── 6-month mean ", Style::default().fg(Color::Blue)),
        Span::styled("── forecast", Style::default().fg(Color::Cyan)),
    ];
    if let Some(target) = &trend.target {
        legend.push(Span::raw(format!("  target {} {:.0}", target.date, target.value)));
    }
    let peak = format!("peak {:.0}", trend.max_value());
    frame.render_widget(
        Paragraph::new(vec![Line::from(legend), Line::from(peak)])
            .style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );
}

/// Braille line chart of history, rolling mean and forecasts on one
/// "YYYY-MM" time axis
struct TrendWidget<'a> {
    trend: &'a Trend,
}

impl Widget for TrendWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let trend = self.trend;
        let mut dates: Vec<&str> = trend
            .history
            .iter()
            .chain(&trend.forecasts)
            .map(|p| p.date.as_str())
            .collect();
        dates.sort_unstable();
        dates.dedup();

        let (w, h) = (area.width as usize, area.height as usize);
        if dates.is_empty() || w == 0 || h == 0 {
            return;
        }
        let (pw, ph) = (w * 2, h * 4);
        let max = trend.max_value().max(1.0);
        let span = (dates.len() - 1).max(1) as f64;

        let to_pixel = |date: &str, value: f64| -> Option<(i32, i32)> {
            let i = dates.binary_search(&date).ok()?;
            let x = (i as f64 / span * (pw - 1) as f64).round() as i32;
            let y = ((1.0 - value / max) * (ph - 1) as f64).round() as i32;
            Some((x, y))
        };

        let plot = |points: &[TrendPoint]| {
            let mut canvas = BrailleCanvas::new(w, h);
            let pixels: Vec<(i32, i32)> = points
                .iter()
                .filter_map(|p| to_pixel(&p.date, p.value))
                .collect();
            if let [single] = pixels.as_slice() {
                canvas.set_pixel_signed(single.0, single.1);
            }
            for pair in pixels.windows(2) {
                draw_line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, |x, y| {
                    canvas.set_pixel_signed(x, y)
                });
            }
            canvas
        };

        render_canvas(&plot(&trend.history), Color::Gray, area, buf);
        render_canvas(&plot(&trend.rolling_mean), Color::Blue, area, buf);
        render_canvas(&plot(&trend.forecasts), Color::Cyan, area, buf);

        if let Some((x, y)) = trend
            .target
            .as_ref()
            .and_then(|t| to_pixel(&t.date, t.value))
        {
            let (col, row) = ((x / 2) as u16, (y / 4) as u16);
            if col < area.width && row < area.height {
                buf[(area.x + col, area.y + row)].set_char('◆').set_fg(Color::Cyan);
            }
        }
    }
}

fn render_covariates(frame: &mut Frame, detail: &CountryDetail, area: Rect) {
    if detail.covariates.is_empty() {
        frame.render_widget(
            Paragraph::new("No covariate data available")
                .style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let label_width = 26usize;
    let bar_width = (area.width as usize).saturating_sub(label_width + 6);
    let lines: Vec<Line> = detail
        .covariates
        .iter()
        .map(|bar| {
            let filled = ((bar.percentile / 100.0) * bar_width as f64).round() as usize;
            Line::from(vec![
                Span::raw(format!("{:<width$.width$}", bar.label, width = label_width)),
                Span::styled("█".repeat(filled), Style::default().fg(band_color(bar.band))),
                Span::raw(format!(" {:.0}%", bar.percentile)),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_peers(frame: &mut Frame, detail: &CountryDetail, area: Rect) {
    let mut peers: Vec<_> = detail.peers.iter().collect();
    peers.sort_by(|a, b| b.predicted_fatalities.total_cmp(&a.predicted_fatalities));

    let rows: Vec<Row> = peers
        .iter()
        .map(|p| {
            let style = Style::default().fg(risk_color(p.risk_category));
            let marker = if p.is_target { "◆" } else { " " };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(p.country_name.clone()),
                Cell::from(format!("{:.3}", p.probability)),
                Cell::from(format!("{:.1}", p.predicted_fatalities)),
                Cell::from(p.risk_category.label()).style(style),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(12),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(24),
        ],
    )
    .header(
        Row::new(vec!["", "Country", "P(≥25)", "Predicted", "Risk"])
            .style(Style::default().fg(Color::DarkGray)),
    )
    .block(panel(&format!("Comparable cases | {}", detail.period().label())));
    frame.render_widget(table, area);
}

fn render_not_found(frame: &mut Frame, code: &str, period: Period, area: Rect) {
    let text = Paragraph::new(vec![
        Line::from(Span::styled(
            "Forecast not found",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("No forecast for {} in {}.", code, period.label())),
        Line::from(""),
        Line::from(Span::styled(
            "Esc: back to map",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(panel("Detail"));
    frame.render_widget(text, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
    ];
    if let Some(lod) = app.map_renderer.active_lod(app.viewport.zoom) {
        spans.push(Span::styled(" (", dim));
        spans.push(Span::styled(lod.label(), Style::default().fg(Color::Magenta)));
        spans.push(Span::styled(")", dim));
    }
    spans.push(Span::styled(" | ", dim));
    spans.push(Span::styled(app.route.to_string(), Style::default().fg(Color::Cyan)));

    if let Some(code) = &app.hovered {
        let name = app.map_renderer.country_name(code).unwrap_or(code.as_str());
        spans.push(Span::styled(" | ", dim));
        spans.push(Span::styled(name.to_string(), Style::default().fg(Color::White)));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(" | ", dim));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    let hints = match app.screen {
        Screen::Map => " | hjkl:pan +/-:zoom [/]:period s:scale ↑↓ enter:open f:fill R:reload q:quit",
        _ => " | [/]:period esc:back R:reload q:quit",
    };
    spans.push(Span::styled(hints, dim));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
