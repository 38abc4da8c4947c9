use log::debug;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Visible area of the host window, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetSize {
    pub width: f64,
    pub height: f64,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetConfig {
    pub size: WidgetSize,
    /// Gap to the bottom-right corner for the initial position.
    pub margin: f64,
    /// Open expanded as soon as the widget is mounted.
    pub auto_open: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            size: WidgetSize {
                width: 280.0,
                height: 350.0,
            },
            margin: 20.0,
            auto_open: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Where a drag started: pointer and widget position at that moment.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragAnchor {
    pointer: Point,
    origin: Point,
}

/// Draggable, expandable overlay that hosts the avatar video.
///
/// The position is always kept inside `[0, viewport - size]` on both axes.
/// When the viewport is smaller than the widget the position pins to 0.
#[derive(Debug)]
pub struct WidgetController {
    config: WidgetConfig,
    viewport: Viewport,
    position: Point,
    expanded: bool,
    drag: Option<DragAnchor>,
}

impl WidgetController {
    pub fn new(viewport: Viewport, config: WidgetConfig) -> Self {
        let size = config.size;
        let mut widget = Self {
            config,
            viewport,
            position: Point::default(),
            expanded: config.auto_open,
            drag: None,
        };
        widget.position = widget.clamp(Point::new(
            viewport.width - size.width - config.margin,
            viewport.height - size.height - config.margin,
        ));
        widget
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn size(&self) -> WidgetSize {
        self.config.size
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Document-level move/up listeners are attached only for the
    /// duration of a drag.
    pub fn listeners_attached(&self) -> bool {
        self.is_dragging()
    }

    /// The embedded player must not swallow pointer events mid-drag.
    pub fn player_accepts_pointer(&self) -> bool {
        !self.is_dragging()
    }

    // -- pointer ------------------------------------------------------------

    /// Returns false when the drag is refused (expanded widget).
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if self.expanded {
            debug!("Ignoring drag start while expanded");
            return false;
        }
        self.drag = Some(DragAnchor {
            pointer,
            origin: self.position,
        });
        debug!(
            "Drag started at ({}, {}) from ({}, {})",
            pointer.x, pointer.y, self.position.x, self.position.y
        );
        true
    }

    /// Move the widget to follow the pointer. No-op outside a drag.
    pub fn drag_move(&mut self, pointer: Point) -> Option<Point> {
        let anchor = self.drag?;
        let wanted = Point::new(
            anchor.origin.x + (pointer.x - anchor.pointer.x),
            anchor.origin.y + (pointer.y - anchor.pointer.y),
        );
        self.position = self.clamp(wanted);
        debug!("Drag frame -> ({}, {})", self.position.x, self.position.y);
        Some(self.position)
    }

    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            debug!("Drag ended at ({}, {})", self.position.x, self.position.y);
        }
    }

    // -- touch --------------------------------------------------------------

    /// Only single-finger touches start a drag.
    pub fn touch_start(&mut self, touches: &[Point]) -> bool {
        match touches {
            [touch] => self.begin_drag(*touch),
            _ => {
                debug!("Ignoring touch start with {} points", touches.len());
                false
            }
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) -> Option<Point> {
        match touches {
            [touch] => self.drag_move(*touch),
            _ => None,
        }
    }

    pub fn touch_end(&mut self) {
        self.end_drag();
    }

    // -- presentation -------------------------------------------------------

    pub fn expand(&mut self) {
        self.end_drag();
        self.expanded = true;
    }

    /// Back to the small widget at its last position. Minimise and close
    /// both land here.
    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    pub fn toggle_expanded(&mut self) {
        if self.expanded {
            self.collapse();
        } else {
            self.expand();
        }
    }

    /// Keep the widget on screen after the window changes size.
    pub fn resize_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let clamped = self.clamp(self.position);
        if clamped != self.position {
            debug!(
                "Viewport {}x{}: widget moved to ({}, {})",
                viewport.width, viewport.height, clamped.x, clamped.y
            );
        }
        self.position = clamped;
    }

    fn clamp(&self, p: Point) -> Point {
        let max_x = (self.viewport.width - self.config.size.width).max(0.0);
        let max_y = (self.viewport.height - self.config.size.height).max(0.0);
        Point::new(p.x.min(max_x).max(0.0), p.y.min(max_y).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collapsed(viewport: Viewport) -> WidgetController {
        WidgetController::new(
            viewport,
            WidgetConfig {
                auto_open: false,
                ..WidgetConfig::default()
            },
        )
    }

    fn in_bounds(widget: &WidgetController) -> bool {
        let p = widget.position();
        let v = widget.viewport();
        let s = widget.size();
        let max_x = (v.width - s.width).max(0.0);
        let max_y = (v.height - s.height).max(0.0);
        (0.0..=max_x).contains(&p.x) && (0.0..=max_y).contains(&p.y)
    }

    #[test]
    fn starts_near_bottom_right_corner() {
        let widget = collapsed(Viewport::new(1280.0, 800.0));
        assert_eq!(widget.position(), Point::new(980.0, 430.0));
        assert!(!widget.is_expanded());
    }

    #[test]
    fn auto_open_starts_expanded() {
        let widget = WidgetController::new(Viewport::new(1280.0, 800.0), WidgetConfig::default());
        assert!(widget.is_expanded());
    }

    #[test]
    fn drag_follows_pointer_delta() {
        // Arrange
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));

        // Act
        assert!(widget.begin_drag(Point::new(1000.0, 500.0)));
        let moved = widget.drag_move(Point::new(900.0, 450.0));
        widget.end_drag();

        // Assert
        assert_eq!(moved, Some(Point::new(880.0, 380.0)));
        assert_eq!(widget.position(), Point::new(880.0, 380.0));
        assert!(!widget.is_dragging());
    }

    #[test]
    fn drag_is_clamped_to_viewport() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        widget.begin_drag(Point::new(0.0, 0.0));

        assert_eq!(
            widget.drag_move(Point::new(-5000.0, -5000.0)),
            Some(Point::new(0.0, 0.0))
        );
        assert_eq!(
            widget.drag_move(Point::new(5000.0, 5000.0)),
            Some(Point::new(1000.0, 450.0))
        );
    }

    #[test]
    fn moves_outside_a_drag_are_ignored() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        let before = widget.position();

        assert_eq!(widget.drag_move(Point::new(10.0, 10.0)), None);

        widget.begin_drag(Point::new(0.0, 0.0));
        widget.end_drag();
        assert_eq!(widget.drag_move(Point::new(10.0, 10.0)), None);
        assert_eq!(widget.position(), before);
    }

    #[test]
    fn listeners_live_only_during_drag() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        assert!(!widget.listeners_attached());
        assert!(widget.player_accepts_pointer());

        widget.begin_drag(Point::new(1.0, 1.0));
        assert!(widget.listeners_attached());
        assert!(!widget.player_accepts_pointer());

        widget.end_drag();
        assert!(!widget.listeners_attached());
        assert!(widget.player_accepts_pointer());
    }

    #[test]
    fn multi_touch_is_not_acted_upon() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        let before = widget.position();

        assert!(!widget.touch_start(&[]));
        assert!(!widget.touch_start(&[Point::new(1.0, 1.0), Point::new(2.0, 2.0)]));
        assert!(!widget.is_dragging());

        assert!(widget.touch_start(&[Point::new(100.0, 100.0)]));
        assert_eq!(
            widget.touch_move(&[Point::new(50.0, 50.0), Point::new(60.0, 60.0)]),
            None
        );
        assert_eq!(widget.position(), before);

        assert_eq!(
            widget.touch_move(&[Point::new(90.0, 100.0)]),
            Some(Point::new(before.x - 10.0, before.y))
        );
        widget.touch_end();
        assert!(!widget.is_dragging());
    }

    #[test]
    fn expanded_widget_cannot_be_dragged() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        widget.expand();
        assert!(!widget.begin_drag(Point::new(0.0, 0.0)));
        assert!(!widget.is_dragging());
    }

    #[test]
    fn expand_collapse_round_trip_preserves_position() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        widget.begin_drag(Point::new(500.0, 500.0));
        widget.drag_move(Point::new(333.5, 271.25));
        widget.end_drag();
        let before = widget.position();

        widget.toggle_expanded();
        assert!(widget.is_expanded());
        widget.toggle_expanded();

        assert!(!widget.is_expanded());
        assert_eq!(widget.position(), before);
    }

    #[test]
    fn viewport_shrink_pulls_widget_back_on_screen() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));

        widget.resize_viewport(Viewport::new(600.0, 500.0));
        assert_eq!(widget.position(), Point::new(320.0, 150.0));

        widget.resize_viewport(Viewport::new(200.0, 200.0));
        assert_eq!(widget.position(), Point::new(0.0, 0.0));
    }

    #[test]
    fn viewport_growth_keeps_position() {
        let mut widget = collapsed(Viewport::new(1280.0, 800.0));
        let before = widget.position();
        widget.resize_viewport(Viewport::new(1920.0, 1080.0));
        assert_eq!(widget.position(), before);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Begin(f64, f64),
        Move(f64, f64),
        End,
        Resize(f64, f64),
        Toggle,
    }

    fn step() -> impl Strategy<Value = Step> {
        let coord = -3000.0..3000.0f64;
        let extent = 100.0..2500.0f64;
        prop_oneof![
            (coord.clone(), coord.clone()).prop_map(|(x, y)| Step::Begin(x, y)),
            (coord.clone(), coord).prop_map(|(x, y)| Step::Move(x, y)),
            Just(Step::End),
            (extent.clone(), extent).prop_map(|(w, h)| Step::Resize(w, h)),
            Just(Step::Toggle),
        ]
    }

    proptest! {
        #[test]
        fn every_frame_stays_in_bounds(steps in prop::collection::vec(step(), 1..64)) {
            let mut widget = collapsed(Viewport::new(1280.0, 800.0));
            prop_assert!(in_bounds(&widget));

            for step in steps {
                match step {
                    Step::Begin(x, y) => { widget.begin_drag(Point::new(x, y)); }
                    Step::Move(x, y) => { widget.drag_move(Point::new(x, y)); }
                    Step::End => widget.end_drag(),
                    Step::Resize(w, h) => widget.resize_viewport(Viewport::new(w, h)),
                    Step::Toggle => widget.toggle_expanded(),
                }
                prop_assert!(in_bounds(&widget), "out of bounds after {:?}", widget);
            }
        }
    }
}
