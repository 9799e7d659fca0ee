//! Body diagram marker.
//!
//! A click on the diagram is stored as whole pixels relative to the image's
//! rendered box. The overlay is placed with a normalized position (a fraction
//! of the rendered size) so it stays put when the image is drawn at a
//! different scale.
//!
//! Stored pixels are never rescaled: if the image renders at another size
//! than when the marker was placed, the overlay drifts from the original
//! click location.

use tracing::debug;

use crate::document::MarkerPosition;

/// The image's bounding box in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

/// Rendered image dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

/// Marker position as a fraction of the rendered image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMarker {
    /// Horizontal fraction.
    pub x: f64,
    /// Vertical fraction.
    pub y: f64,
}

impl NormalizedMarker {
    /// Divide stored pixels by `size`; `None` unless both sides are finite
    /// and positive.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_pixels(position: MarkerPosition, size: ImageSize) -> Option<Self> {
        let usable = |side: f64| side.is_finite() && side > 0.0;
        if !(usable(size.width) && usable(size.height)) {
            return None;
        }
        Some(Self {
            x: position.x as f64 / size.width,
            y: position.y as f64 / size.height,
        })
    }
}

/// Overlay placement as `left`/`top` percentages of the image box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPercent {
    /// Distance from the left edge, in percent.
    pub left: f64,
    /// Distance from the top edge, in percent.
    pub top: f64,
}

/// The diagram's transient, in-memory state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyDiagram {
    image_size: Option<ImageSize>,
    marker: Option<NormalizedMarker>,
}

impl BodyDiagram {
    /// Create a diagram whose image has not loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed rendered size.
    #[must_use]
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    /// Current overlay position.
    #[must_use]
    pub fn marker(&self) -> Option<NormalizedMarker> {
        self.marker
    }

    /// Pixel offset of a click at client coordinates inside `rect`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn locate(client_x: f64, client_y: f64, rect: BoundingRect) -> MarkerPosition {
        MarkerPosition {
            x: (client_x - rect.left).round() as i64,
            y: (client_y - rect.top).round() as i64,
        }
    }

    /// Show the overlay for a stored click, normalized by the click-time box.
    pub fn place(&mut self, position: MarkerPosition, rect: BoundingRect) {
        self.marker = NormalizedMarker::from_pixels(
            position,
            ImageSize {
                width: rect.width,
                height: rect.height,
            },
        );
        debug!(
            "Diagram click at ({}, {}) px, normalized {:?}",
            position.x, position.y, self.marker
        );
    }

    /// Handle a click at client coordinates over an image with box `rect`.
    ///
    /// Returns the pixel position to store; the overlay is placed using the
    /// box at click time.
    pub fn click(&mut self, client_x: f64, client_y: f64, rect: BoundingRect) -> MarkerPosition {
        let position = Self::locate(client_x, client_y, rect);
        self.place(position, rect);
        position
    }

    /// Record the rendered size once the image has loaded.
    ///
    /// A stored marker without an overlay yet gets one derived from the new
    /// size; an existing overlay is kept.
    pub fn image_loaded(&mut self, size: ImageSize, stored: Option<MarkerPosition>) {
        self.image_size = Some(size);
        debug!("Diagram image loaded at {} x {}", size.width, size.height);
        if self.marker.is_none() {
            if let Some(position) = stored {
                self.marker = NormalizedMarker::from_pixels(position, size);
            }
        }
    }

    /// Recompute the overlay after the document changed.
    ///
    /// Needs both a stored marker and a known image size; otherwise the
    /// overlay is left as is.
    pub fn document_changed(&mut self, stored: Option<MarkerPosition>) {
        if let (Some(position), Some(size)) = (stored, self.image_size) {
            self.marker = NormalizedMarker::from_pixels(position, size);
        }
    }

    /// Overlay placement in percent, if a marker is shown.
    #[must_use]
    pub fn overlay_percent(&self) -> Option<OverlayPercent> {
        self.marker.map(|m| OverlayPercent {
            left: m.x * 100.0,
            top: m.y * 100.0,
        })
    }

    /// Clear the overlay. The rendered size is kept.
    pub fn reset(&mut self) {
        self.marker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn rect(width: f64, height: f64) -> BoundingRect {
        BoundingRect {
            left: 100.0,
            top: 50.0,
            width,
            height,
        }
    }

    #[test]
    fn test_click_rounds_offsets_and_normalizes() {
        let mut diagram = BodyDiagram::new();
        let position = diagram.click(225.4, 150.6, rect(500.0, 800.0));

        assert_eq!(position, MarkerPosition { x: 125, y: 101 });
        let marker = diagram.marker().unwrap();
        assert!((marker.x - 125.0 / 500.0).abs() < EPS);
        assert!((marker.y - 101.0 / 800.0).abs() < EPS);
    }

    #[test]
    fn test_click_uses_rect_at_click_time_not_loaded_size() {
        let mut diagram = BodyDiagram::new();
        diagram.image_loaded(
            ImageSize {
                width: 1000.0,
                height: 1000.0,
            },
            None,
        );
        diagram.click(350.0, 250.0, rect(500.0, 400.0));

        let marker = diagram.marker().unwrap();
        assert!((marker.x - 0.5).abs() < EPS);
        assert!((marker.y - 0.5).abs() < EPS);
    }

    #[test]
    fn test_no_marker_before_image_load() {
        let mut diagram = BodyDiagram::new();
        diagram.document_changed(Some(MarkerPosition { x: 10, y: 10 }));
        assert!(diagram.marker().is_none());
        assert!(diagram.overlay_percent().is_none());
    }

    #[test]
    fn test_image_load_derives_marker_from_stored_pixels() {
        let mut diagram = BodyDiagram::new();
        diagram.image_loaded(
            ImageSize {
                width: 400.0,
                height: 200.0,
            },
            Some(MarkerPosition { x: 100, y: 50 }),
        );

        let overlay = diagram.overlay_percent().unwrap();
        assert!((overlay.left - 25.0).abs() < EPS);
        assert!((overlay.top - 25.0).abs() < EPS);
    }

    #[test]
    fn test_image_reload_keeps_existing_marker() {
        let mut diagram = BodyDiagram::new();
        let stored = Some(MarkerPosition { x: 100, y: 50 });
        diagram.image_loaded(
            ImageSize {
                width: 400.0,
                height: 200.0,
            },
            stored,
        );
        let before = diagram.marker();

        diagram.image_loaded(
            ImageSize {
                width: 800.0,
                height: 400.0,
            },
            stored,
        );
        assert_eq!(diagram.marker(), before);
    }

    #[test]
    fn test_rescaled_image_drifts_after_document_change() {
        let mut diagram = BodyDiagram::new();
        let stored = Some(MarkerPosition { x: 100, y: 50 });
        diagram.image_loaded(
            ImageSize {
                width: 800.0,
                height: 400.0,
            },
            stored,
        );
        diagram.document_changed(stored);

        // Pixels were recorded against a smaller image; they are not rescaled.
        let marker = diagram.marker().unwrap();
        assert!((marker.x - 0.125).abs() < EPS);
    }

    #[test]
    fn test_zero_sized_image_has_no_marker() {
        let mut diagram = BodyDiagram::new();
        diagram.image_loaded(
            ImageSize {
                width: 0.0,
                height: 0.0,
            },
            Some(MarkerPosition { x: 1, y: 1 }),
        );
        assert!(diagram.marker().is_none());
    }

    #[test]
    fn test_non_finite_size_has_no_marker() {
        let position = MarkerPosition { x: 5, y: 5 };
        for (width, height) in [(f64::NAN, 10.0), (10.0, f64::NAN), (f64::INFINITY, 10.0)] {
            assert!(NormalizedMarker::from_pixels(position, ImageSize { width, height }).is_none());
        }

        let mut diagram = BodyDiagram::new();
        diagram.click(10.0, 10.0, rect(f64::NAN, 100.0));
        assert!(diagram.overlay_percent().is_none());
    }

    #[test]
    fn test_locate_does_not_touch_overlay() {
        let diagram = BodyDiagram::new();
        let position = BodyDiagram::locate(110.4, 60.6, rect(200.0, 200.0));
        assert_eq!(position, MarkerPosition { x: 10, y: 11 });
        assert!(diagram.marker().is_none());
    }

    #[test]
    fn test_reset_clears_marker_only() {
        let mut diagram = BodyDiagram::new();
        diagram.image_loaded(
            ImageSize {
                width: 10.0,
                height: 10.0,
            },
            Some(MarkerPosition { x: 5, y: 5 }),
        );
        diagram.reset();
        assert!(diagram.marker().is_none());
        assert!(diagram.image_size().is_some());
    }
}
