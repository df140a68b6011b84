//! Viewport-aware tooltip placement.
//!
//! Given the anchor rectangle and the tooltip's measured size, pick one of four cardinal
//! placements that fits the viewport (falling back through a fixed preference order), position
//! the tooltip for it, then clamp so the tooltip is never drawn partially off-screen.

use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default gap between anchor and tooltip, in viewport units.
pub const DEFAULT_OFFSET: f64 = 10.0;

/// Default minimum distance between tooltip and viewport edge, in viewport units.
pub const DEFAULT_MARGIN: f64 = 10.0;

/// Axis aligned rectangle in viewport coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Constructor, Deserialize, Serialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Constructor, Deserialize, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Above,
    Below,
    Left,
    Right,
}

impl Placement {
    pub fn opposite(&self) -> Placement {
        match self {
            Placement::Above => Placement::Below,
            Placement::Below => Placement::Above,
            Placement::Left => Placement::Right,
            Placement::Right => Placement::Left,
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Placement::Above | Placement::Below)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Placement::Above => "above",
            Placement::Below => "below",
            Placement::Left => "left",
            Placement::Right => "right",
        };
        write!(f, "{name}")
    }
}

/// Distances used by [`compute_position`].
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Deserialize, Serialize)]
pub struct PlacementConfig {
    /// Gap between anchor and tooltip.
    pub offset: f64,
    /// Minimum distance between tooltip and viewport edges.
    pub margin: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            margin: DEFAULT_MARGIN,
        }
    }
}

/// Which placements and horizontal alignments fit in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fits {
    pub above: bool,
    pub below: bool,
    pub left: bool,
    pub right: bool,
    /// Tooltip can be centred horizontally on the anchor.
    pub centered: bool,
    /// Tooltip can share the anchor's left edge.
    pub left_aligned: bool,
    /// Tooltip can share the anchor's right edge.
    pub right_aligned: bool,
}

impl Fits {
    pub fn compute(anchor: Rect, tooltip: Size, viewport: Size, config: PlacementConfig) -> Self {
        let PlacementConfig { offset, margin } = config;

        let space_above = anchor.top;
        let space_below = viewport.height - anchor.bottom();
        let space_left = anchor.left;
        let space_right = viewport.width - anchor.right();

        let half_width = tooltip.width / 2.0;
        let center_x = anchor.center_x();

        Self {
            above: space_above >= tooltip.height + offset + margin,
            below: space_below >= tooltip.height + offset + margin,
            left: space_left >= tooltip.width + offset + margin,
            right: space_right >= tooltip.width + offset + margin,
            centered: center_x >= half_width + margin
                && viewport.width - center_x >= half_width + margin,
            left_aligned: anchor.left + tooltip.width + margin <= viewport.width,
            right_aligned: anchor.right() - tooltip.width >= margin,
        }
    }

    pub fn allows(&self, placement: Placement) -> bool {
        match placement {
            Placement::Above => self.above,
            Placement::Below => self.below,
            Placement::Left => self.left,
            Placement::Right => self.right,
        }
    }
}

/// Final tooltip coordinates and the placement they were computed for.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TooltipPosition {
    pub placement: Placement,
    pub top: f64,
    pub left: f64,
}

impl TooltipPosition {
    pub fn rect(&self, size: Size) -> Rect {
        Rect::new(self.top, self.left, size.width, size.height)
    }
}

/// Choose the placement: `preferred` if it fits, else the first fitting fallback, else
/// `preferred` anyway (clamping keeps it on-screen).
pub fn choose_placement(preferred: Placement, fits: &Fits, anchor: Rect, viewport: Size) -> Placement {
    if fits.allows(preferred) {
        return preferred;
    }

    let wider_side = if anchor.left >= viewport.width - anchor.right() {
        Placement::Left
    } else {
        Placement::Right
    };

    let fallbacks = if preferred.is_vertical() {
        [preferred.opposite(), wider_side, wider_side.opposite()]
    } else {
        [preferred.opposite(), Placement::Below, Placement::Above]
    };

    fallbacks
        .into_iter()
        .find(|placement| fits.allows(*placement))
        .unwrap_or(preferred)
}

/// Compute where to draw a tooltip of size `tooltip` anchored to `anchor`.
pub fn compute_position(
    anchor: Rect,
    tooltip: Size,
    preferred: Placement,
    viewport: Size,
    config: PlacementConfig,
) -> TooltipPosition {
    let fits = Fits::compute(anchor, tooltip, viewport, config);
    let placement = choose_placement(preferred, &fits, anchor, viewport);

    let horizontal_left = || {
        if fits.centered {
            anchor.center_x() - tooltip.width / 2.0
        } else if fits.left_aligned {
            anchor.left
        } else if fits.right_aligned {
            anchor.right() - tooltip.width
        } else {
            anchor.center_x() - tooltip.width / 2.0
        }
    };
    let vertical_top = anchor.center_y() - tooltip.height / 2.0;

    let (top, left) = match placement {
        Placement::Above => (anchor.top - tooltip.height - config.offset, horizontal_left()),
        Placement::Below => (anchor.bottom() + config.offset, horizontal_left()),
        Placement::Left => (vertical_top, anchor.left - tooltip.width - config.offset),
        Placement::Right => (vertical_top, anchor.right() + config.offset),
    };

    TooltipPosition {
        placement,
        top: clamp_axis(top, tooltip.height, viewport.height, config.margin),
        left: clamp_axis(left, tooltip.width, viewport.width, config.margin),
    }
}

/// Clamp to `[margin, extent - length - margin]`; the lower bound wins if the tooltip does not
/// fit at all.
fn clamp_axis(value: f64, length: f64, extent: f64, margin: f64) -> f64 {
    value.min(extent - length - margin).max(margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size {
        width: 800.0,
        height: 600.0,
    };
    const TOOLTIP: Size = Size {
        width: 290.0,
        height: 150.0,
    };

    fn position(anchor: Rect, preferred: Placement) -> TooltipPosition {
        compute_position(anchor, TOOLTIP, preferred, VIEWPORT, PlacementConfig::default())
    }

    #[test]
    fn test_preferred_placement_kept_when_it_fits() {
        let anchor = Rect::new(300.0, 300.0, 100.0, 40.0);
        let actual = position(anchor, Placement::Above);

        assert_eq!(actual.placement, Placement::Above);
        assert_eq!(actual.top, 300.0 - 150.0 - DEFAULT_OFFSET);
        assert_eq!(actual.left, 350.0 - 145.0);
    }

    #[test]
    fn test_anchor_near_top_flips_below() {
        let anchor = Rect::new(5.0, 300.0, 100.0, 40.0);
        let actual = position(anchor, Placement::Above);

        assert_eq!(actual.placement, Placement::Below);
        assert_eq!(actual.top, 45.0 + DEFAULT_OFFSET);
    }

    #[test]
    fn test_anchor_at_right_edge_is_clamped() {
        let anchor = Rect::new(300.0, 790.0, 10.0, 10.0);
        let actual = position(anchor, Placement::Above);

        assert!(actual.left <= VIEWPORT.width - TOOLTIP.width - DEFAULT_MARGIN);
        assert!(actual.left >= DEFAULT_MARGIN);
        assert_eq!(actual.left, 500.0);
    }

    #[test]
    fn test_vertical_alignment_fallbacks() {
        struct TestCase {
            anchor: Rect,
            expected_left: f64,
        }

        let tests = vec![
            TestCase {
                // TC0: centred fits
                anchor: Rect::new(300.0, 350.0, 100.0, 20.0),
                expected_left: 400.0 - 145.0,
            },
            TestCase {
                // TC1: too close to left edge to centre, left aligned
                anchor: Rect::new(300.0, 20.0, 40.0, 20.0),
                expected_left: 20.0,
            },
            TestCase {
                // TC2: too close to right edge to centre, right aligned
                anchor: Rect::new(300.0, 700.0, 80.0, 20.0),
                expected_left: 780.0 - 290.0,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = position(test.anchor, Placement::Below);
            assert_eq!(actual.placement, Placement::Below, "TC{} failed", index);
            assert_eq!(actual.left, test.expected_left, "TC{} failed", index);
        }
    }

    #[test]
    fn test_side_fallback_prefers_wider_side() {
        // Anchor spans almost the full height, so neither vertical placement fits
        let left_heavy = Rect::new(100.0, 600.0, 100.0, 400.0);
        assert_eq!(position(left_heavy, Placement::Above).placement, Placement::Left);

        let right_heavy = Rect::new(100.0, 10.0, 100.0, 400.0);
        let actual = position(right_heavy, Placement::Below);
        assert_eq!(actual.placement, Placement::Right);
        assert_eq!(actual.left, 110.0 + DEFAULT_OFFSET);
        assert_eq!(actual.top, 300.0 - 75.0);
    }

    #[test]
    fn test_horizontal_preference_fallbacks() {
        // No room on the left: flips to the right
        let anchor = Rect::new(300.0, 50.0, 40.0, 20.0);
        assert_eq!(position(anchor, Placement::Left).placement, Placement::Right);

        // No room on either side: falls to below
        let wide = Rect::new(100.0, 100.0, 600.0, 20.0);
        assert_eq!(position(wide, Placement::Right).placement, Placement::Below);
    }

    #[test]
    fn test_nothing_fits_keeps_preferred_and_clamps() {
        let viewport = Size::new(200.0, 100.0);
        let anchor = Rect::new(40.0, 80.0, 40.0, 20.0);
        let actual = compute_position(
            anchor,
            TOOLTIP,
            Placement::Above,
            viewport,
            PlacementConfig::default(),
        );

        assert_eq!(actual.placement, Placement::Above);
        assert_eq!(actual.left, DEFAULT_MARGIN);
        assert_eq!(actual.top, DEFAULT_MARGIN);
    }

    #[test]
    fn test_clamp_keeps_tooltip_on_screen() {
        let config = PlacementConfig::new(1.0, 1.0);
        let viewport = Size::new(80.0, 24.0);
        let tooltip = Size::new(30.0, 6.0);

        for top in [0.0, 5.0, 12.0, 20.0, 23.0] {
            for left in [0.0, 10.0, 40.0, 70.0, 79.0] {
                let anchor = Rect::new(top, left, 1.0, 1.0);
                for preferred in [Placement::Above, Placement::Below, Placement::Left, Placement::Right] {
                    let actual = compute_position(anchor, tooltip, preferred, viewport, config);
                    assert!(actual.left >= 1.0 && actual.left + tooltip.width <= 79.0);
                    assert!(actual.top >= 1.0 && actual.top + tooltip.height <= 23.0);
                }
            }
        }
    }

    #[test]
    fn test_rect_contains_is_half_open() {
        let rect = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(14.9, 14.9));
        assert!(!rect.contains(15.0, 12.0));
        assert!(!rect.contains(9.9, 12.0));
    }
}
