use serde::{Deserialize, Serialize};

pub const PERCENT_AXIS_MAX: f64 = 100.0;
pub const GPA_AXIS_MAX: f64 = 4.0;

const WINDOW_PAD: f64 = 0.15;
const WINDOW_MIN_SPAN: f64 = 0.4;
const WINDOW_WIDEN: f64 = 0.2;

const DOUGHNUT_BORDER: &str = "#ffffff";

pub const DEFAULT_PALETTE: [&str; 13] = [
    "#36A2EB", "#FF6384", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40", "#C9CBCF", "#4e73df",
    "#1cc88a", "#36b9cc", "#f6c23e", "#e74a3b", "#858796",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    All,
    Student,
    Subject,
    Predict,
}

impl Filter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "all" => Some(Self::All),
            "student" => Some(Self::Student),
            "subject" => Some(Self::Subject),
            "predict" => Some(Self::Predict),
            _ => None,
        }
    }
}

/// How the predicted-GPA view is drawn: a line on a fixed 0-4 scale, or bars
/// on a tight window around the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredictMode {
    Line,
    Window,
}

impl PredictMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "line" => Some(Self::Line),
            "window" => Some(Self::Window),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSettings {
    pub predict_mode: PredictMode,
    pub palette: Vec<String>,
    pub all_color: String,
    pub subject_color: String,
    pub predict_color: String,
    pub placeholder_name: String,
    pub no_data_message: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            predict_mode: PredictMode::Line,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            all_color: "#4e73df".to_string(),
            subject_color: "#4e73df".to_string(),
            predict_color: "#4e73df".to_string(),
            placeholder_name: "you".to_string(),
            no_data_message: "no data to display".to_string(),
        }
    }
}

impl ChartSettings {
    fn shared_color(&self, filter: Filter) -> &str {
        match filter {
            Filter::Subject => &self.subject_color,
            Filter::Predict => &self.predict_color,
            Filter::All | Filter::Student => &self.all_color,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(labels: Vec<String>, values: Vec<f64>) -> Self {
        Self { labels, values }
    }

    /// Non-empty, equal lengths, finite values.
    pub fn is_renderable(&self) -> bool {
        !self.labels.is_empty()
            && self.labels.len() == self.values.len()
            && self.values.iter().all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartContext {
    pub message: Option<String>,
    pub student_name: Option<String>,
    pub gpa_mode: bool,
    /// Filter forced by the viewer's role when the caller names none.
    pub role_default: Option<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    Doughnut,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Colors {
    Shared(String),
    PerPoint(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AxisBounds {
    None,
    Fixed { min: f64, max: f64 },
    Window { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPlot {
    pub effective_filter: Filter,
    pub chart_kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Colors,
    pub axis: AxisBounds,
    pub title: String,
    pub dataset_label: String,
    pub insight_message: Option<String>,
    pub border_color: String,
    pub fill: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PlotSpec {
    NoData { message: String },
    Ready(ReadyPlot),
}

impl PlotSpec {
    pub fn is_ready(&self) -> bool {
        matches!(self, PlotSpec::Ready(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamError {
    pub code: String,
    pub message: String,
}

impl ParamError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params".to_string(),
            message: message.into(),
        }
    }
}

/// An explicit filter always wins; the role default applies only when none was given.
pub fn resolve_filter(explicit: Option<Filter>, role_default: Option<Filter>) -> Filter {
    explicit.or(role_default).unwrap_or(Filter::All)
}

fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Tight 0..4 window around the data extremes, at least `WINDOW_MIN_SPAN` wide
/// unless clamping cuts it. `None` for empty or non-finite input.
pub fn predict_window(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let vmin = values.iter().copied().fold(f64::INFINITY, f64::min);
    let vmax = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut min = (((vmin - WINDOW_PAD) * 100.0).floor() / 100.0).max(0.0);
    let mut max = (((vmax + WINDOW_PAD) * 100.0).ceil() / 100.0).min(GPA_AXIS_MAX);
    if max - min < WINDOW_MIN_SPAN {
        min = (min - WINDOW_WIDEN).max(0.0);
        max = (max + WINDOW_WIDEN).min(GPA_AXIS_MAX);
    }
    Some((round_2(min), round_2(max)))
}

/// Strips a parenthesised id suffix such as `Sato Hana (K24001)` and falls back
/// to the placeholder when nothing usable is left.
pub fn resolve_display_name(raw: Option<&str>, placeholder: &str) -> String {
    let Some(raw) = raw else {
        return placeholder.to_string();
    };
    let mut name = raw.trim();
    for (open, close) in [('(', ')'), ('（', '）')] {
        if let Some(body) = name.strip_suffix(close) {
            if let Some(start) = body.rfind(open) {
                name = body[..start].trim_end();
            }
        }
    }
    let trimmed = name.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

fn title_for(filter: Filter, name: &str) -> String {
    match filter {
        Filter::All => "Overall distribution".to_string(),
        Filter::Student => format!("Score distribution for {}", name),
        Filter::Subject => "Average score by subject".to_string(),
        Filter::Predict => "GPA trend and prediction".to_string(),
    }
}

fn dataset_label_for(filter: Filter) -> &'static str {
    match filter {
        Filter::All => "Student count",
        Filter::Student => "Score",
        Filter::Subject => "Average score",
        Filter::Predict => "Predicted GPA",
    }
}

fn sort_descending(labels: &mut Vec<String>, values: &mut Vec<f64>) {
    let mut paired: Vec<(String, f64)> = labels.drain(..).zip(values.drain(..)).collect();
    // Vec::sort_by is stable, so equal scores keep their input order.
    paired.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (l, v) in paired {
        labels.push(l);
        values.push(v);
    }
}

fn extreme_indexes(values: &[f64]) -> Option<(usize, usize)> {
    let first = *values.first()?;
    let (mut hi, mut lo) = (0usize, 0usize);
    let (mut hi_v, mut lo_v) = (first, first);
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > hi_v {
            hi = i;
            hi_v = v;
        }
        if v < lo_v {
            lo = i;
            lo_v = v;
        }
    }
    Some((hi, lo))
}

fn insight_for(
    filter: Filter,
    labels: &[String],
    values: &[f64],
    ctx: &ChartContext,
    name: &str,
) -> Option<String> {
    if let Some(msg) = ctx.message.as_deref().filter(|m| !m.is_empty()) {
        return Some(msg.to_string());
    }
    if filter != Filter::Student {
        return None;
    }
    let (hi, lo) = extreme_indexes(values)?;
    Some(format!(
        "{}: strongest in {} ({}), weakest in {} ({}).",
        name, labels[hi], values[hi], labels[lo], values[lo]
    ))
}

pub fn derive_plot_spec(
    filter: Option<Filter>,
    series: &Series,
    ctx: &ChartContext,
    settings: &ChartSettings,
) -> PlotSpec {
    if !series.is_renderable() {
        return PlotSpec::NoData {
            message: settings.no_data_message.clone(),
        };
    }

    let effective = resolve_filter(filter, ctx.role_default);
    let name = resolve_display_name(ctx.student_name.as_deref(), &settings.placeholder_name);

    let mut labels = series.labels.clone();
    let mut values = series.values.clone();
    if effective == Filter::Student {
        sort_descending(&mut labels, &mut values);
    }

    let predict_window_mode = settings.predict_mode == PredictMode::Window;
    let (chart_kind, axis) = match effective {
        Filter::All => {
            let max = if ctx.gpa_mode {
                GPA_AXIS_MAX
            } else {
                PERCENT_AXIS_MAX
            };
            (ChartKind::Bar, AxisBounds::Fixed { min: 0.0, max })
        }
        Filter::Subject => (
            ChartKind::Bar,
            AxisBounds::Fixed {
                min: 0.0,
                max: PERCENT_AXIS_MAX,
            },
        ),
        Filter::Student => (ChartKind::Doughnut, AxisBounds::None),
        Filter::Predict if predict_window_mode => {
            // is_renderable already rejected empty and non-finite input
            let (min, max) = predict_window(&values).unwrap_or((0.0, GPA_AXIS_MAX));
            (ChartKind::Bar, AxisBounds::Window { min, max })
        }
        Filter::Predict => (
            ChartKind::Line,
            AxisBounds::Fixed {
                min: 0.0,
                max: GPA_AXIS_MAX,
            },
        ),
    };

    let colors = if effective == Filter::Student && !settings.palette.is_empty() {
        Colors::PerPoint(
            (0..values.len())
                .map(|i| settings.palette[i % settings.palette.len()].clone())
                .collect(),
        )
    } else {
        Colors::Shared(settings.shared_color(effective).to_string())
    };

    let border_color = if effective == Filter::Predict {
        settings.predict_color.clone()
    } else {
        DOUGHNUT_BORDER.to_string()
    };

    let insight_message = insight_for(effective, &labels, &values, ctx, &name);

    PlotSpec::Ready(ReadyPlot {
        effective_filter: effective,
        chart_kind,
        title: title_for(effective, &name),
        dataset_label: dataset_label_for(effective).to_string(),
        labels,
        values,
        colors,
        axis,
        insight_message,
        border_color,
        fill: effective == Filter::Predict && !predict_window_mode,
    })
}

pub fn parse_filter_param(raw: Option<&serde_json::Value>) -> Result<Option<Filter>, ParamError> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(ParamError::bad_params("filter must be a string"));
            };
            if s.trim().is_empty() {
                return Ok(None);
            }
            Filter::parse(s)
                .map(Some)
                .ok_or_else(|| ParamError::bad_params(format!("unknown filter: {}", s)))
        }
    }
}

/// Labels may be strings or numbers (student numbers, subject ids). A missing
/// array reads as empty so the deriver reports no data rather than failing.
pub fn parse_series(
    labels: Option<&serde_json::Value>,
    values: Option<&serde_json::Value>,
) -> Result<Series, ParamError> {
    let mut series = Series::default();
    match labels {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::Array(items)) => {
            for item in items {
                let label = match item {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => {
                        return Err(ParamError::bad_params(
                            "labels must contain only strings or numbers",
                        ))
                    }
                };
                series.labels.push(label);
            }
        }
        Some(_) => return Err(ParamError::bad_params("labels must be an array")),
    }
    series.values = parse_values(values)?;
    Ok(series)
}

pub fn parse_values(values: Option<&serde_json::Value>) -> Result<Vec<f64>, ParamError> {
    match values {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| ParamError::bad_params("values must contain only numbers"))
            })
            .collect(),
        Some(_) => Err(ParamError::bad_params("values must be an array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(labels: &[&str], values: &[f64]) -> Series {
        Series::new(
            labels.iter().map(|s| s.to_string()).collect(),
            values.to_vec(),
        )
    }

    fn ready(spec: PlotSpec) -> ReadyPlot {
        match spec {
            PlotSpec::Ready(p) => p,
            PlotSpec::NoData { message } => panic!("expected ready plot, got no data: {}", message),
        }
    }

    #[test]
    fn explicit_filter_beats_role_default() {
        assert_eq!(
            resolve_filter(Some(Filter::Predict), Some(Filter::Student)),
            Filter::Predict
        );
        assert_eq!(resolve_filter(None, Some(Filter::Student)), Filter::Student);
        assert_eq!(resolve_filter(None, None), Filter::All);
    }

    #[test]
    fn empty_or_mismatched_series_is_no_data_for_every_filter() {
        let settings = ChartSettings::default();
        let ctx = ChartContext::default();
        let cases = [
            series(&[], &[]),
            series(&["a"], &[]),
            series(&[], &[1.0]),
            series(&["a", "b"], &[1.0]),
            series(&["a"], &[f64::NAN]),
        ];
        for filter in [
            None,
            Some(Filter::All),
            Some(Filter::Student),
            Some(Filter::Subject),
            Some(Filter::Predict),
        ] {
            for s in &cases {
                let spec = derive_plot_spec(filter, s, &ctx, &settings);
                assert_eq!(
                    spec,
                    PlotSpec::NoData {
                        message: "no data to display".to_string()
                    }
                );
            }
        }
    }

    #[test]
    fn student_view_sorts_descending_and_stays_stable() {
        let s = series(&["A", "B", "C", "D"], &[70.0, 90.0, 70.0, 95.0]);
        let p = ready(derive_plot_spec(
            Some(Filter::Student),
            &s,
            &ChartContext::default(),
            &ChartSettings::default(),
        ));
        assert_eq!(p.labels, vec!["D", "B", "A", "C"]);
        assert_eq!(p.values, vec![95.0, 90.0, 70.0, 70.0]);
        assert!(p.values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(p.chart_kind, ChartKind::Doughnut);
        assert_eq!(p.axis, AxisBounds::None);
    }

    #[test]
    fn non_student_views_keep_input_order() {
        let s = series(&["x", "y", "z"], &[1.0, 3.0, 2.0]);
        for f in [Filter::All, Filter::Subject, Filter::Predict] {
            let p = ready(derive_plot_spec(
                Some(f),
                &s,
                &ChartContext::default(),
                &ChartSettings::default(),
            ));
            assert_eq!(p.labels, s.labels);
            assert_eq!(p.values, s.values);
        }
    }

    #[test]
    fn student_insight_names_strongest_and_weakest() {
        let s = series(&["Math", "Art", "PE"], &[90.0, 40.0, 75.0]);
        let ctx = ChartContext {
            student_name: Some("Alice".to_string()),
            ..ChartContext::default()
        };
        let p = ready(derive_plot_spec(
            Some(Filter::Student),
            &s,
            &ctx,
            &ChartSettings::default(),
        ));
        assert_eq!(
            p.insight_message.as_deref(),
            Some("Alice: strongest in Math (90), weakest in Art (40).")
        );
        assert_eq!(p.title, "Score distribution for Alice");
    }

    #[test]
    fn precomputed_message_is_used_verbatim() {
        let s = series(&["Math", "Art"], &[90.0, 40.0]);
        let ctx = ChartContext {
            message: Some("Keep going".to_string()),
            ..ChartContext::default()
        };
        for f in [Filter::All, Filter::Student] {
            let p = ready(derive_plot_spec(Some(f), &s, &ctx, &ChartSettings::default()));
            assert_eq!(p.insight_message.as_deref(), Some("Keep going"));
        }
        let p = ready(derive_plot_spec(
            Some(Filter::Subject),
            &s,
            &ChartContext::default(),
            &ChartSettings::default(),
        ));
        assert_eq!(p.insight_message, None);
    }

    #[test]
    fn insight_ties_pick_first_occurrence() {
        let s = series(&["A", "B", "C", "D"], &[80.0, 80.0, 50.0, 50.0]);
        let p = ready(derive_plot_spec(
            Some(Filter::Student),
            &s,
            &ChartContext::default(),
            &ChartSettings::default(),
        ));
        assert_eq!(
            p.insight_message.as_deref(),
            Some("you: strongest in A (80), weakest in C (50).")
        );
    }

    #[test]
    fn predict_window_pads_and_clamps() {
        let (min, max) = predict_window(&[2.95, 3.10, 3.40]).expect("window");
        assert!(min <= 2.80 && min >= 0.0, "min {}", min);
        assert!(max >= 3.55 && max <= 4.0, "max {}", max);
        assert!(max - min >= 0.4);

        let (min, max) = predict_window(&[0.05, 3.95]).expect("window");
        assert_eq!((min, max), (0.0, 4.0));

        let (min, max) = predict_window(&[3.0]).expect("window");
        assert!(max - min >= 0.4, "narrow window widened: {} {}", min, max);
        assert!(predict_window(&[]).is_none());
    }

    #[test]
    fn predict_mode_selects_chart_kind_and_axis() {
        let s = series(&["T1", "T2", "T3"], &[2.95, 3.10, 3.40]);
        let line = ready(derive_plot_spec(
            Some(Filter::Predict),
            &s,
            &ChartContext::default(),
            &ChartSettings::default(),
        ));
        assert_eq!(line.chart_kind, ChartKind::Line);
        assert_eq!(line.axis, AxisBounds::Fixed { min: 0.0, max: 4.0 });
        assert!(line.fill);

        let settings = ChartSettings {
            predict_mode: PredictMode::Window,
            ..ChartSettings::default()
        };
        let bars = ready(derive_plot_spec(
            Some(Filter::Predict),
            &s,
            &ChartContext::default(),
            &settings,
        ));
        assert_eq!(bars.chart_kind, ChartKind::Bar);
        assert!(matches!(bars.axis, AxisBounds::Window { .. }));
        assert!(!bars.fill);
    }

    #[test]
    fn gpa_distribution_scenario() {
        let s = series(&["0-1", "1-2", "2-3", "3-4"], &[2.0, 5.0, 10.0, 3.0]);
        let ctx = ChartContext {
            gpa_mode: true,
            ..ChartContext::default()
        };
        let p = ready(derive_plot_spec(
            Some(Filter::All),
            &s,
            &ctx,
            &ChartSettings::default(),
        ));
        assert_eq!(p.chart_kind, ChartKind::Bar);
        assert_eq!(p.axis, AxisBounds::Fixed { min: 0.0, max: 4.0 });
        assert_eq!(p.dataset_label, "Student count");
        assert_eq!(p.title, "Overall distribution");
        assert_eq!(p.colors, Colors::Shared("#4e73df".to_string()));
    }

    #[test]
    fn student_colors_cycle_through_palette() {
        let settings = ChartSettings {
            palette: vec!["#111111".to_string(), "#222222".to_string()],
            ..ChartSettings::default()
        };
        let s = series(&["a", "b", "c"], &[3.0, 2.0, 1.0]);
        let p = ready(derive_plot_spec(
            Some(Filter::Student),
            &s,
            &ChartContext::default(),
            &settings,
        ));
        assert_eq!(
            p.colors,
            Colors::PerPoint(vec![
                "#111111".to_string(),
                "#222222".to_string(),
                "#111111".to_string()
            ])
        );
    }

    #[test]
    fn derive_is_deterministic() {
        let s = series(&["Math", "Art", "PE"], &[90.0, 40.0, 75.0]);
        let ctx = ChartContext {
            role_default: Some(Filter::Student),
            ..ChartContext::default()
        };
        let settings = ChartSettings::default();
        assert_eq!(
            derive_plot_spec(None, &s, &ctx, &settings),
            derive_plot_spec(None, &s, &ctx, &settings)
        );
    }

    #[test]
    fn display_name_strips_id_suffix() {
        assert_eq!(resolve_display_name(Some("Sato Hana (K24001)"), "you"), "Sato Hana");
        assert_eq!(resolve_display_name(Some("佐藤（K24001）"), "you"), "佐藤");
        assert_eq!(resolve_display_name(Some("A (x) B (y)"), "you"), "A (x) B");
        assert_eq!(resolve_display_name(Some("Mid (x) Name"), "you"), "Mid (x) Name");
        assert_eq!(resolve_display_name(Some("(K24001)"), "you"), "you");
        assert_eq!(resolve_display_name(Some("   "), "you"), "you");
        assert_eq!(resolve_display_name(None, "you"), "you");
    }

    #[test]
    fn parse_series_accepts_numeric_labels() {
        let labels = serde_json::json!(["K24001", 3]);
        let values = serde_json::json!([1, 2.5]);
        let s = parse_series(Some(&labels), Some(&values)).expect("parse");
        assert_eq!(s.labels, vec!["K24001", "3"]);
        assert_eq!(s.values, vec![1.0, 2.5]);

        let bad = serde_json::json!(["x"]);
        assert!(parse_series(Some(&labels), Some(&bad)).is_err());
        assert!(parse_filter_param(Some(&serde_json::json!("weekly"))).is_err());
        assert_eq!(parse_filter_param(Some(&serde_json::json!(""))).expect("empty"), None);
    }
}
