use crate::error::{AvError, Result};

/// A rectangular region of the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Source-to-rectangle bindings for the canvas, computed once at start.
///
/// Slots are laid out in raster order, two per row: slot `i` sits after the
/// widths of the slots before it in the same row, below the accumulated row
/// heights (a row is as tall as its tallest slot). Every rectangle is
/// validated against the canvas bounds at build time.
#[derive(Debug, Clone)]
pub struct GridLayout {
    canvas_width: u32,
    canvas_height: u32,
    slots: Vec<Rect>,
}

impl GridLayout {
    pub const SLOTS_PER_ROW: usize = 2;
    pub const MAX_SLOTS: usize = 4;

    /// Binds each source, at its native decoded size, to a grid slot.
    pub fn new(canvas_width: u32, canvas_height: u32, sizes: &[(u32, u32)]) -> Result<Self> {
        if sizes.is_empty() || sizes.len() > Self::MAX_SLOTS {
            return Err(AvError::Layout(format!(
                "source count must be 1..={}, got {}",
                Self::MAX_SLOTS,
                sizes.len()
            )));
        }

        let mut slots = Vec::with_capacity(sizes.len());
        let mut y = 0u32;
        for row in sizes.chunks(Self::SLOTS_PER_ROW) {
            let mut x = 0u32;
            let mut row_height = 0u32;
            for &(width, height) in row {
                slots.push(Rect {
                    x,
                    y,
                    width,
                    height,
                });
                x += width;
                row_height = row_height.max(height);
            }
            y += row_height;
        }

        for (slot, rect) in slots.iter().enumerate() {
            if rect.x + rect.width > canvas_width || rect.y + rect.height > canvas_height {
                return Err(AvError::LayoutOverflow {
                    slot,
                    width: rect.x + rect.width,
                    height: rect.y + rect.height,
                    bound_width: canvas_width,
                    bound_height: canvas_height,
                });
            }
        }

        Ok(Self {
            canvas_width,
            canvas_height,
            slots,
        })
    }

    /// Divides the canvas into `count` equal slots: side by side for two
    /// sources, quadrants for three or four.
    pub fn uniform(canvas_width: u32, canvas_height: u32, count: usize) -> Result<Self> {
        if count == 0 || count > Self::MAX_SLOTS {
            return Err(AvError::Layout(format!(
                "source count must be 1..={}, got {count}",
                Self::MAX_SLOTS
            )));
        }
        let columns = count.min(Self::SLOTS_PER_ROW) as u32;
        let rows = count.div_ceil(Self::SLOTS_PER_ROW) as u32;
        if canvas_width % columns != 0 || canvas_height % rows != 0 {
            return Err(AvError::Layout(format!(
                "canvas {canvas_width}x{canvas_height} is not divisible into a {columns}x{rows} grid"
            )));
        }
        let sizes = vec![(canvas_width / columns, canvas_height / rows); count];
        Self::new(canvas_width, canvas_height, &sizes)
    }

    pub fn slot(&self, index: usize) -> Option<Rect> {
        self.slots.get(index).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sources_sit_side_by_side() {
        let layout = GridLayout::new(2560, 720, &[(1280, 720), (1280, 720)]).unwrap();
        assert_eq!(
            layout.slot(0).unwrap(),
            Rect {
                x: 0,
                y: 0,
                width: 1280,
                height: 720
            }
        );
        assert_eq!(
            layout.slot(1).unwrap(),
            Rect {
                x: 1280,
                y: 0,
                width: 1280,
                height: 720
            }
        );
    }

    #[test]
    fn second_slot_starts_after_first_width() {
        // Slot origins depend on the preceding widths, not on equal division.
        let layout = GridLayout::new(2560, 720, &[(1000, 700), (1200, 720)]).unwrap();
        let a = layout.slot(0).unwrap();
        let b = layout.slot(1).unwrap();
        assert_eq!((b.x, b.y), (1000, 0));
        assert!(a.x + a.width <= b.x, "slots must not overlap");
    }

    #[test]
    fn four_sources_fill_quadrants() {
        let layout =
            GridLayout::new(200, 100, &[(100, 50), (100, 50), (100, 50), (100, 50)]).unwrap();
        let origins: Vec<_> = (0..4)
            .map(|i| {
                let r = layout.slot(i).unwrap();
                (r.x, r.y)
            })
            .collect();
        assert_eq!(origins, vec![(0, 0), (100, 0), (0, 50), (100, 50)]);
    }

    #[test]
    fn second_row_starts_below_tallest_slot() {
        let layout = GridLayout::new(200, 200, &[(100, 50), (80, 70), (60, 40)]).unwrap();
        assert_eq!(layout.slot(2).unwrap().y, 70);
    }

    #[test]
    fn oversized_row_is_rejected_at_build() {
        let err = GridLayout::new(2560, 720, &[(1500, 720), (1200, 720)]).unwrap_err();
        assert!(matches!(err, AvError::LayoutOverflow { slot: 1, .. }));
    }

    #[test]
    fn uniform_two_way_split() {
        let layout = GridLayout::uniform(2560, 720, 2).unwrap();
        assert_eq!(layout.slot_count(), 2);
        assert_eq!(
            layout.slot(1).unwrap(),
            Rect {
                x: 1280,
                y: 0,
                width: 1280,
                height: 720
            }
        );
    }

    #[test]
    fn uniform_three_way_uses_quadrants() {
        let layout = GridLayout::uniform(640, 480, 3).unwrap();
        assert_eq!(layout.slot(2).unwrap().y, 240);
        assert_eq!(layout.slot(2).unwrap().width, 320);
    }

    #[test]
    fn uniform_rejects_bad_counts() {
        assert!(matches!(
            GridLayout::uniform(640, 480, 0),
            Err(AvError::Layout(_))
        ));
        assert!(matches!(
            GridLayout::uniform(640, 480, 5),
            Err(AvError::Layout(_))
        ));
    }

    #[test]
    fn uniform_rejects_indivisible_canvas() {
        assert!(matches!(
            GridLayout::uniform(641, 480, 2),
            Err(AvError::Layout(_))
        ));
    }
}
