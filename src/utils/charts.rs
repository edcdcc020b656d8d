//! SVG Chart Generator for Experiment Results
//!
//! Renders the training loss curve and the ROC chart as standalone SVG
//! files that open in any browser.

use std::fs;
use std::path::Path;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";
pub const COLOR_REFERENCE: &str = "#7f8c8d";

/// Series colors, reused in order when there are more series than entries
pub const PALETTE: [&str; 8] = [
    "#3498db", "#2ecc71", "#e74c3c", "#9b59b6", "#f39c12", "#1abc9c", "#e67e22", "#34495e",
];

/// Palette color for the `index`-th series
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// A data series for charts
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    pub color: String,
    pub dashed: bool,
    /// Omit from the legend
    pub hidden_in_legend: bool,
}

impl DataSeries {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>, color: &str) -> Self {
        Self {
            name: name.into(),
            points,
            color: color.to_string(),
            dashed: false,
            hidden_in_legend: false,
        }
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }

    pub fn without_legend(mut self) -> Self {
        self.hidden_in_legend = true;
        self
    }
}

/// Axis titles and value ranges of a line chart
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Fixed x range; derived from the data when `None`
    pub x_range: Option<(f64, f64)>,
    /// Fixed y range; derived from the data when `None`
    pub y_range: Option<(f64, f64)>,
}

impl LineChart {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x_range: None,
            y_range: None,
        }
    }

    pub fn with_x_range(mut self, min: f64, max: f64) -> Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn with_y_range(mut self, min: f64, max: f64) -> Self {
        self.y_range = Some((min, max));
        self
    }

    /// Render the chart as an SVG document
    pub fn render(&self, series: &[DataSeries]) -> String {
        let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

        let (data_x, data_y) = find_ranges(series);
        let (x_min, x_max) = non_degenerate(self.x_range.unwrap_or(data_x));
        let (y_min, y_max) = non_degenerate(self.y_range.unwrap_or(data_y));

        let to_x = |x: f64| MARGIN_LEFT + ((x - x_min) / (x_max - x_min)) * plot_width;
        let to_y = |y: f64| {
            let y = y.clamp(y_min, y_max);
            MARGIN_TOP + plot_height - ((y - y_min) / (y_max - y_min)) * plot_height
        };

        let mut svg = String::new();

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
            CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
        ));
        svg.push_str(&format!(
            r#"<rect width="{}" height="{}" fill="white"/>"#,
            CHART_WIDTH, CHART_HEIGHT
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
            CHART_WIDTH / 2.0, COLOR_TEXT, escape_xml(&self.title)
        ));

        // Grid lines with tick labels on both axes
        for i in 0..=5 {
            let frac = i as f64 / 5.0;

            let y = MARGIN_TOP + plot_height - frac * plot_height;
            svg.push_str(&format!(
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
                MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
            ));
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
                MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, tick_label(y_min + frac * (y_max - y_min))
            ));

            let x = MARGIN_LEFT + frac * plot_width;
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{}</text>"#,
                x, MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, tick_label(x_min + frac * (x_max - x_min))
            ));
        }

        // Axes
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
            MARGIN_LEFT, MARGIN_TOP + plot_height, MARGIN_LEFT + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
        ));
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
            MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, MARGIN_TOP + plot_height, COLOR_AXIS
        ));

        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
            MARGIN_LEFT + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT, escape_xml(&self.x_label)
        ));
        svg.push_str(&format!(
            r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
            CHART_HEIGHT / 2.0, COLOR_TEXT, CHART_HEIGHT / 2.0, escape_xml(&self.y_label)
        ));

        for s in series.iter().filter(|s| !s.points.is_empty()) {
            // non-finite values (diverged loss) are left out of the line
            let path = s
                .points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .enumerate()
                .map(|(i, &(x, y))| {
                    let cmd = if i == 0 { "M" } else { "L" };
                    format!("{} {:.2} {:.2}", cmd, to_x(x), to_y(y))
                })
                .collect::<Vec<_>>()
                .join(" ");

            let dash = if s.dashed { r#" stroke-dasharray="6 4""# } else { "" };
            svg.push_str(&format!(
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"{}/>"#,
                path, s.color, dash
            ));
        }

        // Legend, bottom right inside the plot area
        let entries: Vec<&DataSeries> = series.iter().filter(|s| !s.hidden_in_legend).collect();
        let mut legend_y = MARGIN_TOP + plot_height - 20.0 * entries.len() as f64;
        for s in entries {
            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="14" height="4" fill="{}"/>"#,
                MARGIN_LEFT + plot_width - 330.0, legend_y + 4.0, s.color
            ));
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
                MARGIN_LEFT + plot_width - 310.0, legend_y + 10.0, COLOR_TEXT, escape_xml(&s.name)
            ));
            legend_y += 20.0;
        }

        svg.push_str("</svg>");
        svg
    }

    /// Render the chart and write it to `output_path`
    pub fn write(&self, series: &[DataSeries], output_path: &Path) -> std::io::Result<()> {
        fs::write(output_path, self.render(series))
    }
}

fn find_ranges(series: &[DataSeries]) -> ((f64, f64), (f64, f64)) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);

    for &(px, py) in series.iter().flat_map(|s| &s.points) {
        if px.is_finite() {
            x = (x.0.min(px), x.1.max(px));
        }
        if py.is_finite() {
            y = (y.0.min(py), y.1.max(py));
        }
    }

    (x, y)
}

/// Widen an empty or inverted range so the scale stays finite
fn non_degenerate((min, max): (f64, f64)) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if max - min <= f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

fn tick_label(value: f64) -> String {
    if value.abs() >= 100.0 || value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_line_chart_written_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("loss.svg");

        let series = vec![DataSeries::new(
            "Training Loss",
            vec![(1.0, 2.1), (2.0, 1.7), (3.0, 1.2)],
            palette_color(0),
        )];
        LineChart::new("Loss Curve", "Step", "Loss")
            .with_y_range(0.0, 3.2)
            .write(&series, &path)
            .unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Loss Curve"));
        assert!(svg.contains("Training Loss"));
    }

    #[test]
    fn test_dashed_series_and_hidden_legend() {
        let series = vec![
            DataSeries::new("reference", vec![(0.0, 0.0), (1.0, 1.0)], COLOR_REFERENCE)
                .dashed()
                .without_legend(),
            DataSeries::new("curve <a>", vec![(0.0, 0.0), (0.2, 0.9), (1.0, 1.0)], palette_color(1)),
        ];
        let svg = LineChart::new("ROC", "FPR", "TPR")
            .with_x_range(0.0, 1.0)
            .with_y_range(0.0, 1.05)
            .render(&series);

        assert!(svg.contains("stroke-dasharray"));
        assert!(!svg.contains(">reference<"));
        assert!(svg.contains("curve &lt;a&gt;"));
    }

    #[test]
    fn test_non_finite_points_do_not_break_scale() {
        let series = vec![DataSeries::new(
            "loss",
            vec![(1.0, f64::NAN), (2.0, 1.0)],
            palette_color(0),
        )];
        let svg = LineChart::new("t", "x", "y").render(&series);
        assert!(!svg.contains("inf"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(palette_color(0), palette_color(PALETTE.len()));
    }
}
