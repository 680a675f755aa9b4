//! Going from free-form text to a [`Figure`].

use crate::{
    ops::{self, Builtins, Context},
    sample::{self, DomainError, SampleDomain, Sampling},
    solve::{self, Strategy},
    Equation, Expression, Parameter, PlotError,
};
use euclid::{Box2D, Point2D};
use plotters::prelude::*;
use serde::Serialize;
use std::error::Error;

/// The coordinate space graphs are drawn in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GraphSpace {}

pub type Point = Point2D<f64, GraphSpace>;
pub type Bounds = Box2D<f64, GraphSpace>;

/// Knobs for [`plot_function_with()`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PlotConfig {
    pub x_range: (f64, f64),
    pub samples: usize,
    /// Width of the rendered image, in pixels.
    pub width: u32,
    /// Height of the rendered image, in pixels.
    pub height: u32,
}

impl PlotConfig {
    pub fn with_x_range(self, low: f64, high: f64) -> Self {
        PlotConfig {
            x_range: (low, high),
            ..self
        }
    }

    pub fn with_samples(self, samples: usize) -> Self {
        PlotConfig { samples, ..self }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        PlotConfig {
            width,
            height,
            ..self
        }
    }

    pub fn domain(&self) -> Result<SampleDomain, DomainError> {
        let (low, high) = self.x_range;
        SampleDomain::new(low, high, self.samples)
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            x_range: SampleDomain::DEFAULT_RANGE,
            samples: SampleDomain::DEFAULT_SAMPLES,
            width: 1000,
            height: 600,
        }
    }
}

/// Parse `text`, solve it, and sample every solution over `x_range`
/// (`-10..10` when not provided) using the builtin functions.
///
/// # Examples
///
/// ```rust
/// let figure = mathplot::plot_function("x^2 + y^2 = 4", None).unwrap();
///
/// assert_eq!(figure.curves.len(), 2);
/// assert_eq!(figure.title, "Plot of x^2 + y^2 = 4");
/// ```
pub fn plot_function(
    text: &str,
    x_range: Option<(f64, f64)>,
) -> Result<Figure, PlotError> {
    let mut config = PlotConfig::default();

    if let Some((low, high)) = x_range {
        config = config.with_x_range(low, high);
    }

    plot_function_with(text, &config, &Builtins)
}

/// The general form of [`plot_function()`].
pub fn plot_function_with<C>(
    text: &str,
    config: &PlotConfig,
    ctx: &C,
) -> Result<Figure, PlotError>
where
    C: Context,
{
    let equation: Equation =
        text.parse().map_err(|e| PlotError::parse(text, e))?;
    let domain = config.domain()?;

    let equation = equation.simplified(ctx);
    let target = equation.solve_target();
    tracing::debug!(%equation, %target, "parsed the equation");

    let solutions = solve::solve(&equation, &target, ctx)?;

    let x = Parameter::x();
    let xs = domain.points();

    let curves = solutions
        .iter()
        .map(|branch| {
            let (sampling, ys) = sample::sample_branch(branch, &x, &xs, ctx);
            let points = xs
                .iter()
                .zip(ys.iter())
                .map(|(&x, &y)| Point::new(x, y))
                .collect();

            Curve {
                label: format!("Solution: {}", branch),
                expression: branch.clone(),
                sampling,
                points,
            }
        })
        .collect();

    Ok(Figure {
        title: format!("Plot of {}", text.trim()),
        x_label: String::from("x"),
        y_label: String::from("y"),
        grid: true,
        target,
        strategy: solutions.strategy(),
        x_range: (domain.low(), domain.high()),
        reference_lines: vec![
            ReferenceLine::Horizontal { y: 0.0 },
            ReferenceLine::Vertical { x: 0.0 },
        ],
        curves,
    })
}

/// Parse `text` as a single expression and simplify it as far as possible
/// using the builtin functions and constants.
///
/// Expressions without free parameters fold down to a single constant.
pub fn evaluate_expression(text: &str) -> Result<Expression, PlotError> {
    let expr: Expression =
        text.parse().map_err(|e| PlotError::parse(text, e))?;

    Ok(ops::fold_constants(&expr, &Builtins))
}

/// A renderable plot of every solution to an equation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub grid: bool,
    /// The parameter that was solved for.
    pub target: Parameter,
    pub strategy: Strategy,
    pub x_range: (f64, f64),
    pub reference_lines: Vec<ReferenceLine>,
    /// One curve per solution branch, in solution order.
    pub curves: Vec<Curve>,
}

impl Figure {
    /// The area the figure covers.
    ///
    /// The x extent is always the sampled range, and the y extent covers
    /// every finite point with a bit of padding.
    pub fn bounds(&self) -> Bounds {
        let (low, high) = self.x_range;

        let (min_y, max_y) = self
            .curves
            .iter()
            .flat_map(|c| c.points.iter())
            .map(|p| p.y)
            .filter(|y| y.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, y| match acc {
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
                None => Some((y, y)),
            })
            .unwrap_or((-1.0, 1.0));

        // scale before subtracting so huge spans don't overflow
        let padding = if max_y > min_y {
            max_y * 0.05 - min_y * 0.05
        } else {
            1.0
        };

        Bounds::new(
            Point::new(low, (min_y - padding).max(f64::MIN)),
            Point::new(high, (max_y + padding).min(f64::MAX)),
        )
    }

    /// Render the figure as an SVG document.
    pub fn render_svg(
        &self,
        width: u32,
        height: u32,
    ) -> Result<String, RenderError> {
        let bounds = self.bounds();
        if !bounds.width().is_finite() || !bounds.height().is_finite() {
            return Err(RenderError(format!(
                "the range {}..{} is too large to draw",
                bounds.min.y, bounds.max.y
            )));
        }

        let mut svg = String::new();

        draw(self, SVGBackend::with_string(&mut svg, (width, height)))
            .map_err(|e| RenderError(e.to_string()))?;

        Ok(svg)
    }
}

fn draw<DB>(figure: &Figure, backend: DB) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let bounds = figure.bounds();
    let x_range = bounds.min.x..bounds.max.x;
    let y_range = bounds.min.y..bounds.max.y;

    let mut chart = ChartBuilder::on(&root)
        .caption(&figure.title, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(figure.x_label.as_str())
        .y_desc(figure.y_label.as_str());
    if !figure.grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    for line in &figure.reference_lines {
        let path = match *line {
            ReferenceLine::Horizontal { y } if y_range.contains(&y) => {
                vec![(x_range.start, y), (x_range.end, y)]
            },
            ReferenceLine::Vertical { x } if x_range.contains(&x) => {
                vec![(x, y_range.start), (x, y_range.end)]
            },
            _ => continue,
        };

        chart.draw_series(std::iter::once(PathElement::new(
            path,
            BLACK.mix(0.5).stroke_width(1),
        )))?;
    }

    for (i, curve) in figure.curves.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let mut segments = curve.segments();

        if segments.is_empty() {
            // keep a legend entry for curves with nothing to draw
            segments.push(Vec::new());
        }

        for (j, segment) in segments.into_iter().enumerate() {
            let series = chart
                .draw_series(LineSeries::new(segment, color.stroke_width(2)))?;

            if j == 0 {
                series.label(curve.label.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color)
                });
            }
        }
    }

    if !figure.curves.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;

    Ok(())
}

/// A horizontal or vertical line drawn across the whole figure.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceLine {
    Horizontal { y: f64 },
    Vertical { x: f64 },
}

/// The sampled values for a single solution branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub label: String,
    #[serde(skip)]
    pub expression: Expression,
    pub sampling: Sampling,
    /// May contain non-finite y values where the branch has no real value.
    pub points: Vec<Point>,
}

impl Curve {
    /// Split the curve into runs of consecutive finite points.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();

        for point in &self.points {
            if point.x.is_finite() && point.y.is_finite() {
                current.push((point.x, point.y));
            } else if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        }

        if !current.is_empty() {
            segments.push(current);
        }

        segments
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unable to render the figure: {0}")]
pub struct RenderError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn curve(ys: &[f64]) -> Curve {
        Curve {
            label: String::from("test"),
            expression: Expression::Constant(0.0),
            sampling: Sampling::Varying,
            points: ys
                .iter()
                .enumerate()
                .map(|(i, &y)| Point::new(i as f64, y))
                .collect(),
        }
    }

    #[test]
    fn segments_break_at_non_finite_values() {
        let curve =
            curve(&[f64::NAN, 1.0, 2.0, f64::INFINITY, 4.0, f64::NAN]);

        let got = curve.segments();

        assert_eq!(got, vec![vec![(1.0, 1.0), (2.0, 2.0)], vec![(4.0, 4.0)]]);
    }

    #[test]
    fn configuration_builders() {
        let got = PlotConfig::default()
            .with_x_range(-1.0, 1.0)
            .with_samples(10)
            .with_size(200, 100);

        assert_eq!(
            got,
            PlotConfig {
                x_range: (-1.0, 1.0),
                samples: 10,
                width: 200,
                height: 100,
            }
        );
        assert_eq!(got.domain().unwrap().points().len(), 10);
    }

    #[test]
    fn bounds_cover_the_finite_points() {
        let figure = plot_function("y = x", Some((-2.0, 2.0))).unwrap();

        let got = figure.bounds();

        assert_eq!(got.min.x, -2.0);
        assert_eq!(got.max.x, 2.0);
        assert!(got.min.y < -2.0 && got.min.y > -2.5);
        assert!(got.max.y > 2.0 && got.max.y < 2.5);
    }

    #[test]
    fn bounds_stay_finite_for_huge_values() {
        let figure = plot_function("y = 10^307*x", None).unwrap();

        let got = figure.bounds();

        assert!(got.min.y.is_finite() && got.max.y.is_finite());
        assert!(got.min.y <= -1e308 && got.max.y >= 1e308);
    }

    #[test]
    fn refuse_to_render_a_range_wider_than_f64() {
        let figure = plot_function("y = 10^307*x", None).unwrap();

        let got = figure.render_svg(320, 240);

        assert!(matches!(got, Err(RenderError(_))));
    }

    #[test]
    fn bounds_of_an_empty_figure() {
        let figure = plot_function("x^2 + 1", None).unwrap();

        let got = figure.bounds();

        assert!(figure.curves.is_empty());
        assert!(got.min.y < got.max.y);
    }

    #[test]
    fn the_figure_is_labelled() {
        let figure = plot_function("  y = 2*x  ", None).unwrap();

        assert_eq!(figure.title, "Plot of y = 2*x");
        assert_eq!(figure.x_label, "x");
        assert_eq!(figure.y_label, "y");
        assert!(figure.grid);
        assert_eq!(
            figure.reference_lines,
            vec![
                ReferenceLine::Horizontal { y: 0.0 },
                ReferenceLine::Vertical { x: 0.0 },
            ]
        );
        assert_eq!(figure.curves[0].label, "Solution: 2*x");
    }

    #[test]
    fn render_an_svg() {
        let figure = plot_function("x^2 + y^2 = 4", None).unwrap();

        let svg = figure.render_svg(640, 480).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Plot of x^2 + y^2 = 4"));
        assert!(svg.contains("Solution: sqrt(4 - x^2)"));
    }

    #[test]
    fn unevaluable_branches_are_kept_without_points() {
        let figure = plot_function("y = x + a", None).unwrap();

        assert_eq!(figure.curves.len(), 1);
        let curve = &figure.curves[0];
        assert!(matches!(curve.sampling, Sampling::Unevaluable { .. }));
        assert!(curve.points.is_empty());
        assert!(figure.render_svg(320, 240).is_ok());
    }

    #[test]
    fn a_custom_context_is_used() {
        struct Degrees;

        impl Context for Degrees {
            fn evaluate_function(
                &self,
                name: &str,
                argument: f64,
            ) -> Result<f64, ops::EvaluationError> {
                Builtins.evaluate_function(name, argument.to_radians())
            }

            fn constant(&self, name: &str) -> Option<f64> {
                Builtins.constant(name)
            }

            fn invert_function(
                &self,
                name: &str,
                value: &Expression,
            ) -> Result<arrayvec::ArrayVec<Expression, 2>, ops::EvaluationError>
            {
                Builtins.invert_function(name, value)
            }
        }

        let config = PlotConfig::default().with_x_range(0.0, 90.0);

        let figure = plot_function_with("y = sin(x)", &config, &Degrees).unwrap();

        let last = figure.curves[0].points.last().unwrap();
        approx::assert_relative_eq!(last.y, 1.0);
    }

    #[test]
    fn evaluate_a_constant_expression() {
        let got = evaluate_expression("2 * (3 + 4)^2").unwrap();

        assert_eq!(got, Expression::Constant(98.0));

        let got = evaluate_expression("x + 2*3").unwrap();
        assert_eq!(got.to_string(), "x + 6");

        let got = evaluate_expression("2 +").unwrap_err();
        assert_eq!(got.kind(), ErrorKind::Parse);
    }
}
