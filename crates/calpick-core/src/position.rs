use crate::config::{
  Horizontal,
  Position,
  Vertical
};
use crate::host::{
  Rect,
  Size,
  Viewport
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
  pub left:           f64,
  pub top:            f64,
  pub left_aligned:   bool,
  pub bottom_aligned: bool
}

impl Placement {
  #[must_use]
  pub fn horizontal_class(
    &self
  ) -> (&'static str, &'static str) {
    if self.left_aligned {
      ("left-aligned", "right-aligned")
    } else {
      ("right-aligned", "left-aligned")
    }
  }

  #[must_use]
  pub fn vertical_class(
    &self
  ) -> (&'static str, &'static str) {
    if self.bottom_aligned {
      ("bottom-aligned", "top-aligned")
    } else {
      ("top-aligned", "bottom-aligned")
    }
  }
}

/// Places a popup of `popup` size below
/// the left edge of `anchor`, flipping
/// to the right edge or above when the
/// configured position asks for it and
/// there is room, or when `reposition`
/// is set and the popup would overflow.
#[must_use]
pub fn compute_placement(
  anchor: Rect,
  popup: Size,
  viewport: Viewport,
  position: Position,
  reposition: bool
) -> Placement {
  let mut left = anchor.left;
  let mut top = anchor.bottom();
  let mut left_aligned = true;
  let mut bottom_aligned = true;

  let flipped_left =
    left - popup.width + anchor.width;
  if (reposition
    && left + popup.width > viewport.width)
    || (position.horizontal
      == Horizontal::Right
      && flipped_left > 0.0)
  {
    left = flipped_left.max(0.0);
    left_aligned = false;
  }

  let flipped_top =
    top - popup.height - anchor.height;
  if (reposition
    && top + popup.height
      > viewport.height + viewport.scroll_y)
    || (position.vertical == Vertical::Top
      && flipped_top > 0.0)
  {
    top = flipped_top.max(0.0);
    bottom_aligned = false;
  }

  Placement {
    left: left.max(0.0),
    top: top.max(0.0),
    left_aligned,
    bottom_aligned
  }
}
