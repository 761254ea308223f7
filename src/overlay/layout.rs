//! Turns a frame report into 2D shapes. No GPU access, so layout can be tested directly.

use crate::config::StatesConfig;
use crate::content::ContentRecord;
use crate::frame::FrameReport;
use crate::labels::LabelPlacement;

use super::font::TextMetrics;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const PANEL: Color = Color::rgba(0.05, 0.07, 0.12, 0.85);
    pub const ACCENT: Color = Color::rgb(1.0, 0.78, 0.35);

    /// Same colour with its alpha multiplied by `factor`.
    pub fn faded(self, factor: f32) -> Self {
        Self {
            a: self.a * factor.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Square of side `size` centred on a point.
    pub fn centered(x: f32, y: f32, size: f32) -> Self {
        Self::new(x - size * 0.5, y - size * 0.5, size, size)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Rect { rect: Rect, color: Color },
    /// Text with its top-left corner at `(x, y)`.
    Text { x: f32, y: f32, text: String, color: Color },
}

const MARGIN: f32 = 40.0;
const MARKER: f32 = 10.0;
const AWAY_MARKER: f32 = 5.0;
const PANEL_PADDING: f32 = 16.0;

/// Everything the overlay shows for one frame.
pub struct OverlayInput<'a> {
    pub report: &'a FrameReport,
    pub records: &'a [ContentRecord],
    pub states: &'a StatesConfig,
    pub width: f32,
    pub height: f32,
}

/// Greedy word wrap to `max_width`. Words wider than the line are kept whole.
pub fn wrap_text(text: &str, max_width: f32, metrics: &dyn TextMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if metrics.measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Lay out labels, state overlays, the item popup and the loading indicator.
///
/// Without `metrics` (no font loaded) text is omitted and labels are drawn as markers.
pub fn layout(input: &OverlayInput, metrics: Option<&dyn TextMetrics>) -> Vec<Shape> {
    let mut shapes = Vec::new();

    if !input.report.loaded {
        loading(&mut shapes, input, metrics);
        return shapes;
    }

    if input.report.label_opacity > 0.0 {
        for placement in &input.report.placements {
            label(&mut shapes, input, placement, metrics);
        }
    }

    for (id, overlay) in &input.report.overlays {
        if !overlay.is_visible() || overlay.opacity <= 0.0 {
            continue;
        }
        let Some(preset) = input.states.get(id) else {
            continue;
        };
        let Some(metrics) = metrics else {
            continue;
        };
        let mut y = MARGIN;
        shapes.push(Shape::Text {
            x: MARGIN,
            y,
            text: preset.title.clone(),
            color: Color::ACCENT.faded(overlay.opacity),
        });
        y += metrics.line_height() * 1.5;
        for line in &preset.lines {
            shapes.push(Shape::Text {
                x: MARGIN,
                y,
                text: line.clone(),
                color: Color::WHITE.faded(overlay.opacity),
            });
            y += metrics.line_height();
        }
    }

    if let Some(record) = input.report.popup.and_then(|i| input.records.get(i)) {
        popup(&mut shapes, input, record, metrics);
    }

    shapes
}

fn loading(shapes: &mut Vec<Shape>, input: &OverlayInput, metrics: Option<&dyn TextMetrics>) {
    let (cx, cy) = (input.width * 0.5, input.height * 0.5);
    match metrics {
        Some(metrics) => {
            let text = "Loading...";
            shapes.push(Shape::Text {
                x: cx - metrics.measure(text) * 0.5,
                y: cy - metrics.line_height() * 0.5,
                text: text.to_string(),
                color: Color::WHITE,
            });
        }
        None => shapes.push(Shape::Rect {
            rect: Rect::new(cx - 60.0, cy - 2.0, 120.0, 4.0),
            color: Color::WHITE.faded(0.6),
        }),
    }
}

fn label(
    shapes: &mut Vec<Shape>,
    input: &OverlayInput,
    placement: &LabelPlacement,
    metrics: Option<&dyn TextMetrics>,
) {
    let (x, y) = (placement.screen.x, placement.screen.y);
    let opacity = input.report.label_opacity;
    if !placement.is_facing() {
        shapes.push(Shape::Rect {
            rect: Rect::centered(x, y, AWAY_MARKER),
            color: Color::WHITE.faded(0.35 * opacity),
        });
        return;
    }

    let hovered = input.report.hovered == Some(placement.item);
    let color = if hovered { Color::ACCENT } else { Color::WHITE }.faded(opacity);
    shapes.push(Shape::Rect {
        rect: Rect::centered(x, y, MARKER),
        color,
    });

    let (Some(metrics), Some(record)) = (metrics, input.records.get(placement.item)) else {
        return;
    };
    let text_x = x + MARKER;
    let text_y = y - metrics.line_height() * 0.5;
    shapes.push(Shape::Rect {
        rect: Rect::new(
            text_x - 4.0,
            text_y,
            metrics.measure(&record.name) + 8.0,
            metrics.line_height(),
        ),
        color: Color::PANEL.faded(0.8 * opacity),
    });
    shapes.push(Shape::Text {
        x: text_x,
        y: text_y,
        text: record.name.clone(),
        color,
    });
}

fn popup(
    shapes: &mut Vec<Shape>,
    input: &OverlayInput,
    record: &ContentRecord,
    metrics: Option<&dyn TextMetrics>,
) {
    let width = (input.width * 0.4).clamp(240.0, 420.0);
    let x = input.width - width - MARGIN;
    let inner = width - PANEL_PADDING * 2.0;

    let Some(metrics) = metrics else {
        shapes.push(Shape::Rect {
            rect: Rect::new(x, MARGIN, width, input.height - MARGIN * 2.0),
            color: Color::PANEL,
        });
        return;
    };

    let line_height = metrics.line_height();
    let mut body = Vec::new();
    for paragraph in record.paragraphs() {
        body.extend(wrap_text(&paragraph, inner, metrics));
        body.push(String::new());
    }
    body.push("Esc to close".to_string());

    let height = PANEL_PADDING * 2.0 + line_height * (body.len() as f32 + 1.5);
    shapes.push(Shape::Rect {
        rect: Rect::new(x, MARGIN, width, height.min(input.height - MARGIN * 2.0)),
        color: Color::PANEL,
    });

    let mut y = MARGIN + PANEL_PADDING;
    shapes.push(Shape::Text {
        x: x + PANEL_PADDING,
        y,
        text: record.name.clone(),
        color: Color::ACCENT,
    });
    y += line_height * 1.5;
    for line in body {
        if y + line_height > input.height - MARGIN {
            break;
        }
        if !line.is_empty() {
            shapes.push(Shape::Text {
                x: x + PANEL_PADDING,
                y,
                text: line,
                color: Color::WHITE,
            });
        }
        y += line_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{OverlayState, StateId, Visibility};
    use crate::labels::Facing;
    use glam::{Vec2, Vec3};

    /// Every character is 10px wide, lines are 20px.
    struct Fixed;

    impl TextMetrics for Fixed {
        fn measure(&self, text: &str) -> f32 {
            text.chars().count() as f32 * 10.0
        }

        fn line_height(&self) -> f32 {
            20.0
        }
    }

    fn record(name: &str) -> ContentRecord {
        ContentRecord {
            name: name.into(),
            position: Vec3::Z,
            camera: Vec3::new(0.0, 0.0, 4.0),
            look_at: Vec3::ZERO,
            planet_rotation: 0.0,
            body: "<p>First paragraph.</p><p>Second one.</p>".into(),
        }
    }

    fn placement(item: usize, facing: Facing) -> LabelPlacement {
        LabelPlacement {
            item,
            facing,
            screen: Vec2::new(100.0, 100.0),
            depth: 0.5,
            dot: 0.0,
        }
    }

    fn texts(shapes: &[Shape]) -> Vec<&str> {
        shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Text { text, .. } => Some(text.as_str()),
                Shape::Rect { .. } => None,
            })
            .collect()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox", 100.0, &Fixed);
        assert_eq!(lines, vec!["the quick", "brown fox"]);
        assert_eq!(wrap_text("", 100.0, &Fixed), Vec::<String>::new());
        assert_eq!(wrap_text("unbreakablewordhere", 50.0, &Fixed), vec!["unbreakablewordhere"]);
    }

    #[test]
    fn loading_shows_only_indicator() {
        let report = FrameReport::default();
        let states = StatesConfig::default();
        let input = OverlayInput {
            report: &report,
            records: &[],
            states: &states,
            width: 800.0,
            height: 600.0,
        };
        assert_eq!(texts(&layout(&input, Some(&Fixed))), vec!["Loading..."]);
        assert_eq!(layout(&input, None).len(), 1);
    }

    #[test]
    fn away_labels_are_markers_only() {
        let records = [record("About"), record("Coral")];
        let report = FrameReport {
            loaded: true,
            placements: vec![placement(0, Facing::Camera), placement(1, Facing::Away)],
            label_opacity: 1.0,
            ..Default::default()
        };
        let states = StatesConfig::default();
        let input = OverlayInput {
            report: &report,
            records: &records,
            states: &states,
            width: 800.0,
            height: 600.0,
        };
        let shapes = layout(&input, Some(&Fixed));
        assert_eq!(texts(&shapes), vec!["About"]);
    }

    #[test]
    fn labels_fade_with_home_and_vanish_when_hidden() {
        let records = [record("About")];
        let mut report = FrameReport {
            loaded: true,
            placements: vec![placement(0, Facing::Camera)],
            label_opacity: 0.5,
            ..Default::default()
        };
        let states = StatesConfig::default();
        let shapes = layout(
            &OverlayInput {
                report: &report,
                records: &records,
                states: &states,
                width: 800.0,
                height: 600.0,
            },
            Some(&Fixed),
        );
        let name = shapes
            .iter()
            .find_map(|s| match s {
                Shape::Text { text, color, .. } if text == "About" => Some(*color),
                _ => None,
            })
            .unwrap();
        assert!((name.a - 0.5).abs() < 1e-6);

        report.label_opacity = 0.0;
        let input = OverlayInput {
            report: &report,
            records: &records,
            states: &states,
            width: 800.0,
            height: 600.0,
        };
        assert!(layout(&input, Some(&Fixed)).is_empty());
        assert!(layout(&input, None).is_empty());
    }

    #[test]
    fn overlay_text_fades_with_opacity() {
        let report = FrameReport {
            loaded: true,
            overlays: vec![
                (
                    StateId::home(),
                    OverlayState {
                        opacity: 0.5,
                        visibility: Visibility::Visible,
                    },
                ),
                (
                    StateId::about(),
                    OverlayState {
                        opacity: 0.0,
                        visibility: Visibility::Hidden,
                    },
                ),
            ],
            ..Default::default()
        };
        let states = StatesConfig::default();
        let input = OverlayInput {
            report: &report,
            records: &[],
            states: &states,
            width: 800.0,
            height: 600.0,
        };
        let shapes = layout(&input, Some(&Fixed));
        let title = shapes
            .iter()
            .find_map(|s| match s {
                Shape::Text { text, color, .. } if text == "Hello, explorer" => Some(*color),
                _ => None,
            })
            .unwrap();
        assert!((title.a - 0.5).abs() < 1e-6);
        assert!(!texts(&shapes).contains(&"About"));
    }

    #[test]
    fn popup_shows_name_and_paragraphs() {
        let records = [record("Coral")];
        let report = FrameReport {
            loaded: true,
            popup: Some(0),
            ..Default::default()
        };
        let states = StatesConfig::default();
        let input = OverlayInput {
            report: &report,
            records: &records,
            states: &states,
            width: 1280.0,
            height: 720.0,
        };
        let shapes = layout(&input, Some(&Fixed));
        let texts = texts(&shapes);
        assert_eq!(texts[0], "Coral");
        assert!(texts.contains(&"First paragraph."));
        assert!(texts.contains(&"Second one."));
        assert!(texts.contains(&"Esc to close"));
    }
}
