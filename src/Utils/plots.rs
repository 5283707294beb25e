use crate::symbolic::symbolic_engine::Expr;
use log::{debug, warn};
use ndarray::Array1;
use plotters::prelude::*;
use std::fs;

pub const PLOT_TITLE: &str = "Gráfica de la función original e integral";

/// Geometry of the comparison figure.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    pub samples: usize,
    pub domain: (f64, f64),
    pub width: u32,
    pub height: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        PlotSettings { samples: 400, domain: (-10.0, 10.0), width: 1000, height: 600 }
    }
}

/// Both curves evaluated on the same grid.
#[derive(Debug, Clone)]
pub struct Samples {
    pub x: Array1<f64>,
    pub original: Array1<f64>,
    pub integral: Array1<f64>,
}

/// `x**2*sin(x)` -> `x^2 sin(x)`, the form used in the legend.
pub fn legend_form(expr: &str) -> String {
    expr.replace("**", "^").replace('*', " ")
}

/// Evaluates the function and its antiderivative in `var` on an even grid over the domain.
/// Fails if either expression has a symbol without value or the lengths disagree.
pub fn sample_pair(
    original: &Expr,
    integral: &Expr,
    var: &str,
    settings: &PlotSettings,
) -> Result<Samples, String> {
    let (a, b) = settings.domain;
    let x = Array1::linspace(a, b, settings.samples);
    let original_values = original.eval_on(var, &x)?;
    let integral_values = integral.eval_on(var, &x)?;
    if original_values.len() != x.len() || integral_values.len() != x.len() {
        return Err(format!(
            "{} points sampled but {} and {} values obtained",
            x.len(),
            original_values.len(),
            integral_values.len()
        ));
    }
    Ok(Samples { x, original: original_values, integral: integral_values })
}

/// Runs of consecutive finite points; a pole or a domain gap breaks the curve.
fn finite_segments(x: &Array1<f64>, y: &Array1<f64>) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if yi.is_finite() {
            current.push((xi, yi));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn value_range(samples: &Samples) -> (f64, f64) {
    let (min, max) = samples
        .original
        .iter()
        .chain(samples.integral.iter())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = if max > min { 0.05 * (max - min) } else { 1.0 };
    (min - pad, max + pad)
}

/// Renders the original curve (solid blue) and the antiderivative (dashed red) and
/// returns the PNG bytes. If no font can be loaded the figure is drawn again without
/// text.
pub fn render_comparison(
    samples: &Samples,
    original_label: &str,
    integral_label: &str,
    settings: &PlotSettings,
) -> Result<Vec<u8>, String> {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .map_err(|e| format!("cannot create image file: {}", e))?;
    let path = file.path().to_path_buf();
    let labels = Some((original_label, integral_label));
    if let Err(e) = draw(samples, labels, settings, &path) {
        warn!("plot with labels failed ({}), drawing without text", e);
        draw(samples, None, settings, &path).map_err(|e| e.to_string())?;
    }
    let bytes = fs::read(&path).map_err(|e| format!("cannot read rendered image: {}", e))?;
    debug!("rendered {} bytes of PNG", bytes.len());
    Ok(bytes)
}

fn draw(
    samples: &Samples,
    labels: Option<(&str, &str)>,
    settings: &PlotSettings,
    path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let (x_min, x_max) = settings.domain;
    let (y_min, y_max) = value_range(samples);

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if labels.is_some() {
        builder
            .caption(PLOT_TITLE, ("sans-serif", 30))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    if labels.is_some() {
        chart.configure_mesh().x_desc("x").y_desc("f(x)").draw()?;
    }

    for (i, segment) in finite_segments(&samples.x, &samples.original).into_iter().enumerate() {
        let mut series = chart.draw_series(LineSeries::new(segment, BLUE.stroke_width(2)))?;
        if let (0, Some((original, _))) = (i, labels) {
            series
                .label(format!("Original: {}", original))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
        }
    }
    for (i, segment) in finite_segments(&samples.x, &samples.integral).into_iter().enumerate() {
        let mut series =
            chart.draw_series(DashedLineSeries::new(segment, 10, 6, RED.stroke_width(2)))?;
        if let (0, Some((_, integral))) = (i, labels) {
            series
                .label(format!("Integral: {}", integral))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
        }
    }

    if labels.is_some() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}
