//! ASCII charts over a typed sample stream.
//!
//! The engine hands over one [`Sample`] per selected row; the chart draws
//! onto a char canvas and renders owned text lines for the presenter to
//! overlay. Four kinds: line, bar, pie, scatter.

/// One charted point: an optional row label and a numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label: Option<String>,
    pub value: f64,
}

impl Sample {
    pub fn new(label: Option<String>, value: f64) -> Self {
        Self { label, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Scatter,
}

impl ChartKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "line" => Some(ChartKind::Line),
            "bar" => Some(ChartKind::Bar),
            "pie" => Some(ChartKind::Pie),
            "scatter" => Some(ChartKind::Scatter),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
        }
    }
}

pub const DEFAULT_WIDTH: usize = 60;
pub const DEFAULT_HEIGHT: usize = 20;

const MIN_WIDTH: usize = 24;
const MAX_WIDTH: usize = 200;
const MIN_HEIGHT: usize = 10;
const MAX_HEIGHT: usize = 60;

/// Left gutter for y-axis labels, bottom rows for the x axis.
const MARGIN_LEFT: usize = 9;
const MARGIN_BOTTOM: usize = 2;

/// Sector symbols for pie slices, reused cyclically.
const SECTOR_SYMBOLS: [char; 8] = ['#', '*', '+', 'x', 'o', '@', '%', '&'];

pub struct Chart {
    kind: ChartKind,
    title: String,
    width: usize,
    height: usize,
    canvas: Vec<Vec<char>>,
    legend: Vec<String>,
}

impl Chart {
    pub fn new(kind: ChartKind, title: &str) -> Self {
        Self::with_size(kind, title, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn with_size(kind: ChartKind, title: &str, width: usize, height: usize) -> Self {
        let width = width.clamp(MIN_WIDTH, MAX_WIDTH);
        let height = height.clamp(MIN_HEIGHT, MAX_HEIGHT);
        Self {
            kind,
            title: title.to_string(),
            width,
            height,
            canvas: vec![vec![' '; width]; height],
            legend: Vec::new(),
        }
    }

    fn plot_width(&self) -> usize {
        self.width - MARGIN_LEFT - 1
    }

    fn plot_height(&self) -> usize {
        self.height - MARGIN_BOTTOM - 1
    }

    fn set_pixel(&mut self, x: usize, y: usize, c: char) {
        if y < self.height && x < self.width {
            self.canvas[y][x] = c;
        }
    }

    fn write_text(&mut self, x: usize, y: usize, text: &str) {
        for (i, c) in text.chars().enumerate() {
            self.set_pixel(x + i, y, c);
        }
    }

    /// Plot a sample stream. Replaces any previous plot on this chart.
    pub fn plot(&mut self, samples: &[Sample]) {
        for row in &mut self.canvas {
            row.fill(' ');
        }
        self.legend.clear();

        if samples.is_empty() {
            self.write_text(MARGIN_LEFT + 2, self.height / 2, "(no numeric data)");
            return;
        }

        match self.kind {
            ChartKind::Pie => self.plot_pie(samples),
            ChartKind::Line => {
                self.draw_axes(samples);
                self.plot_line(samples);
            }
            ChartKind::Bar => {
                self.draw_axes(samples);
                self.plot_bars(samples);
            }
            ChartKind::Scatter => {
                self.draw_axes(samples);
                self.plot_scatter(samples);
            }
        }
    }

    /// The finished chart as text lines: title, canvas, then any legend.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.height + self.legend.len() + 1);
        let title = format!("[{} chart] {}", self.kind.name(), self.title);
        lines.push(title);
        for row in &self.canvas {
            lines.push(row.iter().collect::<String>().trim_end().to_string());
        }
        lines.extend(self.legend.iter().cloned());
        lines
    }

    fn value_bounds(samples: &[Sample]) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for s in samples {
            min = min.min(s.value);
            max = max.max(s.value);
        }
        // Bars and scaling want a zero baseline when everything is positive.
        if min > 0.0 {
            min = 0.0;
        }
        if (max - min).abs() < f64::EPSILON {
            max = min + 1.0;
        }
        (min, max)
    }

    fn draw_axes(&mut self, samples: &[Sample]) {
        let (min, max) = Self::value_bounds(samples);
        let bottom = self.plot_height();

        for y in 0..=bottom {
            self.set_pixel(MARGIN_LEFT, y, '|');
        }
        for x in MARGIN_LEFT..self.width {
            self.set_pixel(x, bottom, '-');
        }
        self.set_pixel(MARGIN_LEFT, bottom, '+');

        let top_label = format_axis_value(max);
        let bottom_label = format_axis_value(min);
        let top_x = MARGIN_LEFT.saturating_sub(top_label.len() + 1);
        let bottom_x = MARGIN_LEFT.saturating_sub(bottom_label.len() + 1);
        self.write_text(top_x, 0, &top_label);
        self.write_text(bottom_x, bottom.saturating_sub(1), &bottom_label);
    }

    /// y canvas row for a value, 0 at the top of the plot area.
    fn scale_y(&self, value: f64, min: f64, max: f64) -> usize {
        let bottom = self.plot_height();
        let frac = (value - min) / (max - min);
        let scaled = (frac * (bottom.saturating_sub(1)) as f64).round() as usize;
        bottom - 1 - scaled.min(bottom - 1)
    }

    fn sample_x(&self, index: usize, count: usize) -> usize {
        let w = self.plot_width().saturating_sub(1).max(1);
        if count <= 1 {
            MARGIN_LEFT + 1 + w / 2
        } else {
            MARGIN_LEFT + 1 + index * w / (count - 1)
        }
    }

    fn plot_line(&mut self, samples: &[Sample]) {
        let (min, max) = Self::value_bounds(samples);
        let mut prev: Option<(usize, usize)> = None;
        for (i, s) in samples.iter().enumerate() {
            let x = self.sample_x(i, samples.len());
            let y = self.scale_y(s.value, min, max);
            if let Some((px, py)) = prev {
                self.draw_segment(px, py, x, y, '.');
            }
            prev = Some((x, y));
        }
        // Points on top of the connecting dots.
        for (i, s) in samples.iter().enumerate() {
            let x = self.sample_x(i, samples.len());
            let y = self.scale_y(s.value, min, max);
            self.set_pixel(x, y, '*');
        }
    }

    /// Stepped segment between two canvas points.
    fn draw_segment(&mut self, x1: usize, y1: usize, x2: usize, y2: usize, symbol: char) {
        let (dx, dy) = (x2 as isize - x1 as isize, y2 as isize - y1 as isize);
        let steps = dx.abs().max(dy.abs());
        if steps == 0 {
            self.set_pixel(x1, y1, symbol);
            return;
        }
        for step in 0..=steps {
            let x = x1 as isize + dx * step / steps;
            let y = y1 as isize + dy * step / steps;
            self.set_pixel(x as usize, y as usize, symbol);
        }
    }

    fn plot_bars(&mut self, samples: &[Sample]) {
        let (min, max) = Self::value_bounds(samples);
        let bottom = self.plot_height();
        let zero_y = self.scale_y(0.0, min, max);
        let slot = (self.plot_width() / samples.len()).max(1);
        let bar_width = (slot * 2 / 3).max(1);

        for (i, s) in samples.iter().enumerate() {
            let x0 = MARGIN_LEFT + 1 + i * slot + (slot - bar_width) / 2;
            let y = self.scale_y(s.value, min, max);
            let (y_top, y_bot) = if y <= zero_y { (y, zero_y) } else { (zero_y, y) };
            for x in x0..(x0 + bar_width).min(self.width) {
                for yy in y_top..=y_bot.min(bottom - 1) {
                    self.set_pixel(x, yy, '#');
                }
            }
            if let Some(label) = &s.label {
                let shown: String = label.chars().take(bar_width.max(3)).collect();
                self.write_text(x0, bottom + 1, &shown);
            }
        }
    }

    fn plot_scatter(&mut self, samples: &[Sample]) {
        let (min, max) = Self::value_bounds(samples);
        for (i, s) in samples.iter().enumerate() {
            let x = self.sample_x(i, samples.len());
            let y = self.scale_y(s.value, min, max);
            self.set_pixel(x, y, '*');
        }
    }

    fn plot_pie(&mut self, samples: &[Sample]) {
        let total: f64 = samples.iter().map(|s| s.value.abs()).sum();
        if total <= 0.0 {
            self.write_text(MARGIN_LEFT + 2, self.height / 2, "(nothing to plot)");
            return;
        }

        // Cumulative sector boundaries as angle fractions of one turn.
        let mut bounds = Vec::with_capacity(samples.len());
        let mut acc = 0.0;
        for s in samples {
            acc += s.value.abs() / total;
            bounds.push(acc);
        }

        let cx = self.width as f64 / 2.0;
        let cy = (self.height - MARGIN_BOTTOM) as f64 / 2.0;
        // Terminal cells are roughly twice as tall as wide.
        let radius = cy.min(self.width as f64 / 4.0) - 1.0;

        for y in 0..self.height - MARGIN_BOTTOM {
            for x in 0..self.width {
                let dx = (x as f64 - cx) / 2.0;
                let dy = y as f64 - cy;
                if (dx * dx + dy * dy).sqrt() * 2.0 > radius * 2.0 {
                    continue;
                }
                let mut angle = dy.atan2(dx) / std::f64::consts::TAU + 0.5;
                if angle >= 1.0 {
                    angle -= 1.0;
                }
                let sector = bounds.iter().position(|&b| angle < b).unwrap_or(samples.len() - 1);
                self.set_pixel(x, y, SECTOR_SYMBOLS[sector % SECTOR_SYMBOLS.len()]);
            }
        }

        for (i, s) in samples.iter().enumerate() {
            let pct = s.value.abs() / total * 100.0;
            let label = s.label.as_deref().unwrap_or("(unnamed)");
            self.legend.push(format!(
                "  {} {} - {:.1}%",
                SECTOR_SYMBOLS[i % SECTOR_SYMBOLS.len()],
                label,
                pct
            ));
        }
    }
}

fn format_axis_value(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e9 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<Sample> {
        values.iter().map(|&v| Sample::new(None, v)).collect()
    }

    #[test]
    fn kind_parsing() {
        assert_eq!(ChartKind::parse("bar"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::parse("PIE"), Some(ChartKind::Pie));
        assert_eq!(ChartKind::parse("donut"), None);
    }

    #[test]
    fn render_has_title_and_canvas_rows() {
        let mut chart = Chart::new(ChartKind::Line, "A1:B4");
        chart.plot(&samples(&[1.0, 2.0, 3.0]));
        let lines = chart.render();
        assert_eq!(lines.len(), DEFAULT_HEIGHT + 1);
        assert!(lines[0].contains("line chart"));
        assert!(lines[0].contains("A1:B4"));
    }

    #[test]
    fn empty_samples_show_placeholder() {
        let mut chart = Chart::new(ChartKind::Bar, "");
        chart.plot(&[]);
        let text = chart.render().join("\n");
        assert!(text.contains("(no numeric data)"));
    }

    #[test]
    fn bar_chart_heights_track_values() {
        let mut chart = Chart::with_size(ChartKind::Bar, "", 40, 20);
        chart.plot(&samples(&[1.0, 10.0]));
        let text = chart.render().join("\n");
        let hashes = text.matches('#').count();
        assert!(hashes > 0);

        let mut tall = Chart::with_size(ChartKind::Bar, "", 40, 20);
        tall.plot(&samples(&[10.0, 10.0]));
        let tall_hashes = tall.render().join("\n").matches('#').count();
        assert!(tall_hashes > hashes, "{} vs {}", tall_hashes, hashes);
    }

    #[test]
    fn bar_labels_appear_under_axis() {
        let mut chart = Chart::with_size(ChartKind::Bar, "", 48, 16);
        chart.plot(&[
            Sample::new(Some("apples".into()), 3.0),
            Sample::new(Some("pears".into()), 5.0),
        ]);
        let text = chart.render().join("\n");
        assert!(text.contains("app"));
        assert!(text.contains("pea"));
    }

    #[test]
    fn line_chart_marks_points() {
        let mut chart = Chart::with_size(ChartKind::Line, "", 40, 12);
        chart.plot(&samples(&[1.0, 5.0, 2.0]));
        let text = chart.render().join("\n");
        assert!(text.matches('*').count() >= 3);
        assert!(text.contains('|'));
        assert!(text.contains('-'));
    }

    #[test]
    fn scatter_points_count() {
        let mut chart = Chart::with_size(ChartKind::Scatter, "", 40, 12);
        chart.plot(&samples(&[1.0, 2.0, 3.0, 4.0]));
        let stars = chart.render().join("\n").matches('*').count();
        assert_eq!(stars, 4);
    }

    #[test]
    fn pie_legend_percentages() {
        let mut chart = Chart::with_size(ChartKind::Pie, "", 40, 16);
        chart.plot(&[
            Sample::new(Some("a".into()), 3.0),
            Sample::new(Some("b".into()), 1.0),
        ]);
        let text = chart.render().join("\n");
        assert!(text.contains("a - 75.0%"));
        assert!(text.contains("b - 25.0%"));
    }

    #[test]
    fn size_is_clamped() {
        let chart = Chart::with_size(ChartKind::Line, "", 5, 2);
        assert_eq!(chart.render().len(), MIN_HEIGHT + 1);
    }

    #[test]
    fn flat_series_does_not_divide_by_zero() {
        let mut chart = Chart::with_size(ChartKind::Line, "", 40, 12);
        chart.plot(&samples(&[2.0, 2.0, 2.0]));
        let text = chart.render().join("\n");
        assert!(text.contains('*'));
    }
}
