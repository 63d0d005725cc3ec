//! Page geometry: lengths, page sizes and the trim-size rectangle

/// Length in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 72.0)
    }

    /// Get the value in points
    pub fn pt(&self) -> f64 {
        self.0
    }

    /// Get the value in inches
    pub fn inches(&self) -> f64 {
        self.0 / 72.0
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_inches(8.5),
            height: Length::from_inches(11.0),
        }
    }
}

/// Axis-aligned rectangle in PDF user space (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl Rect {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self { llx, lly, urx, ury }
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }
}

/// Trim margins as fractions of a US Letter page
const LEFT_RIGHT_MARGIN: f64 = 1.25 / 8.5;
const TOP_MARGIN: f64 = 0.67 / 11.0;
const BOTTOM_MARGIN: f64 = 1.33 / 11.0;

/// Scale-and-crop geometry turning a full-size page into the trim size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimGeometry {
    pub scale: f64,
    /// The whole page after scaling, anchored at the origin
    pub scaled: Rect,
    /// The part of the scaled page that stays visible
    pub visible: Rect,
}

impl TrimGeometry {
    /// Compute the trim rectangle for a page of `width` × `height` points.
    ///
    /// Scaling shrinks the page towards the origin; the deltas recentre the
    /// fixed margins on the shrunken page so material keeps its position
    /// relative to the trim edges.
    pub fn compute(width: f64, height: f64, scale: f64) -> Self {
        let new_width = width * scale;
        let new_height = height * scale;

        let delta_w = (width - new_width) / 2.0;
        let delta_h = (height - new_height) / 2.0;

        let left_right = width * LEFT_RIGHT_MARGIN - delta_w;
        let top = height * TOP_MARGIN - delta_h;
        let bottom = height * BOTTOM_MARGIN - delta_h;

        Self {
            scale,
            scaled: Rect::new(0.0, 0.0, new_width, new_height),
            visible: Rect::new(left_right, bottom, new_width - left_right, new_height - top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_length_conversions() {
        let len = Length::from_inches(1.0);
        assert!(close(len.pt(), 72.0));
        assert!(close(Length(36.0).inches(), 0.5));
    }

    #[test]
    fn test_letter_size() {
        let letter = PageDimensions::letter();
        assert!(close(letter.width.pt(), 612.0));
        assert!(close(letter.height.pt(), 792.0));
    }

    #[test]
    fn test_trim_letter_at_095() {
        let letter = PageDimensions::letter();
        let geometry = TrimGeometry::compute(letter.width.pt(), letter.height.pt(), 0.95);

        assert!(close(Length(geometry.scaled.width()).inches(), 8.075));
        assert!(close(Length(geometry.scaled.height()).inches(), 10.45));

        // The visible area is the 6" x 9" trim size
        assert!(close(Length(geometry.visible.width()).inches(), 6.0));
        assert!(close(Length(geometry.visible.height()).inches(), 9.0));

        assert!(close(geometry.visible.llx, 74.7));
        assert!(close(geometry.visible.lly, 75.96));
        assert!(close(geometry.visible.urx, 506.7));
        assert!(close(geometry.visible.ury, 723.96));
    }

    #[test]
    fn test_trim_identity_scale() {
        let geometry = TrimGeometry::compute(612.0, 792.0, 1.0);
        assert_eq!(geometry.scaled, Rect::new(0.0, 0.0, 612.0, 792.0));
        // Margins still apply at full scale
        assert!(close(geometry.visible.llx, 90.0));
        assert!(close(geometry.visible.urx, 522.0));
    }
}
