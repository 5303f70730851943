//! Output compositing.
//!
//! Each instance renders into its own padded framebuffer; the compositor
//! block-copies the visible pixels of each into a fixed slot of one packed
//! output buffer. Straight scanline copies only — no blending, no scaling,
//! no resampling. The output geometry is fixed at load time by the layout
//! policy and the buffer is fully overwritten every tick.

use quadlink_core::VideoDimensions;

use crate::instances::InstanceSet;

/// How instance framebuffers tile into the presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// One instance, passed through.
    Single,
    /// 2 or 3 instances side by side: equal heights, widths summed.
    HorizontalStrip(usize),
    /// Four instances in quadrants: doubled width and height, output row
    /// pitch twice the single-instance pitch.
    Grid2x2,
}

impl LayoutPolicy {
    /// Policy for an instance count. Counts outside the recognized set fall
    /// back to the largest valid sub-layout.
    #[must_use]
    pub fn for_count(count: usize) -> Self {
        match count {
            0 | 1 => Self::Single,
            2 | 3 => Self::HorizontalStrip(count),
            _ => Self::Grid2x2,
        }
    }

    /// Slot grid as (columns, rows).
    #[must_use]
    pub const fn grid(&self) -> (usize, usize) {
        match self {
            Self::Single => (1, 1),
            Self::HorizontalStrip(n) => (*n, 1),
            Self::Grid2x2 => (2, 2),
        }
    }

    /// Top-left pixel of `slot` in the output, as (column, row).
    const fn slot_origin(&self, slot: usize, dims: VideoDimensions) -> (usize, usize) {
        let (cols, _) = self.grid();
        let col = slot % cols;
        let row = slot / cols;
        (col * dims.width as usize, row * dims.height as usize)
    }
}

/// The composed output buffer. Packed rows: stride equals width.
pub struct PresentedFrame {
    pixels: Vec<u16>,
    width: u32,
    height: u32,
}

impl PresentedFrame {
    #[must_use]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in pixels.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width as usize
    }
}

/// Copies every instance's visible pixels into its slot, once per tick.
pub struct VideoCompositor {
    layout: LayoutPolicy,
    src_dims: VideoDimensions,
    src_stride: usize,
    frame: PresentedFrame,
}

impl VideoCompositor {
    /// Geometry is fixed here, at load time.
    #[must_use]
    pub fn new(layout: LayoutPolicy, src_dims: VideoDimensions, src_stride: usize) -> Self {
        let (cols, rows) = layout.grid();
        let width = src_dims.width * cols as u32;
        let height = src_dims.height * rows as u32;
        Self {
            layout,
            src_dims,
            src_stride,
            frame: PresentedFrame {
                pixels: vec![0; width as usize * height as usize],
                width,
                height,
            },
        }
    }

    #[must_use]
    pub fn layout(&self) -> LayoutPolicy {
        self.layout
    }

    #[must_use]
    pub fn frame(&self) -> &PresentedFrame {
        &self.frame
    }

    /// Overwrite the output with this tick's instance framebuffers.
    ///
    /// Always succeeds for a valid set: every slot offset was computed from
    /// the grid at construction and every source buffer has the fixed
    /// per-instance geometry.
    pub fn compose(&mut self, set: &InstanceSet) {
        let width = self.src_dims.width as usize;
        let height = self.src_dims.height as usize;
        let out_stride = self.frame.stride();
        let (cols, rows) = self.layout.grid();
        let slots = cols * rows;

        for instance in set.iter().take(slots) {
            let (x0, y0) = self.layout.slot_origin(instance.index(), self.src_dims);
            let src = instance.core().framebuffer();
            for row in 0..height {
                let src_start = row * self.src_stride;
                let dst_start = (y0 + row) * out_stride + x0;
                self.frame.pixels[dst_start..dst_start + width]
                    .copy_from_slice(&src[src_start..src_start + width]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::InstanceSet;
    use crate::testutil::{FAKE_HEIGHT, FAKE_STRIDE, FAKE_WIDTH, FILL_COLORS, FakeFactory};

    #[test]
    fn layout_follows_instance_count() {
        assert_eq!(LayoutPolicy::for_count(1), LayoutPolicy::Single);
        assert_eq!(LayoutPolicy::for_count(2), LayoutPolicy::HorizontalStrip(2));
        assert_eq!(LayoutPolicy::for_count(3), LayoutPolicy::HorizontalStrip(3));
        assert_eq!(LayoutPolicy::for_count(4), LayoutPolicy::Grid2x2);
        // Out-of-range counts fall back to the largest valid layout.
        assert_eq!(LayoutPolicy::for_count(7), LayoutPolicy::Grid2x2);
    }

    fn composed(count: usize) -> (PresentedFrame, VideoCompositor) {
        let factory = FakeFactory::new();
        let mut set = InstanceSet::create(&factory, &[1; 16], count).expect("load");
        for instance in set.iter_mut() {
            instance.core_mut().run_frame();
        }
        let dims = set.first().core().video_dimensions();
        let mut compositor =
            VideoCompositor::new(LayoutPolicy::for_count(count), dims, FAKE_STRIDE);
        compositor.compose(&set);
        let frame = PresentedFrame {
            pixels: compositor.frame().pixels().to_vec(),
            width: compositor.frame().width(),
            height: compositor.frame().height(),
        };
        (frame, compositor)
    }

    #[test]
    fn single_layout_passes_visible_pixels_through() {
        let (frame, _) = composed(1);
        assert_eq!(frame.width(), FAKE_WIDTH);
        assert_eq!(frame.height(), FAKE_HEIGHT);
        assert!(frame.pixels().iter().all(|&px| px == FILL_COLORS[0]));
    }

    #[test]
    fn strip_layout_sums_widths() {
        let (frame, _) = composed(3);
        assert_eq!(frame.width(), 3 * FAKE_WIDTH);
        assert_eq!(frame.height(), FAKE_HEIGHT);
        for row in 0..FAKE_HEIGHT as usize {
            for col in 0..frame.width() as usize {
                let slot = col / FAKE_WIDTH as usize;
                let px = frame.pixels()[row * frame.stride() + col];
                assert_eq!(px, FILL_COLORS[slot], "row {row} col {col}");
            }
        }
    }

    #[test]
    fn grid_layout_fills_exact_quadrants_without_bleed() {
        // Four distinct solid colors must land in their own quadrant of the
        // doubled-geometry output, with no pixel crossing a quadrant edge.
        let (frame, compositor) = composed(4);
        assert_eq!(frame.width(), 2 * FAKE_WIDTH);
        assert_eq!(frame.height(), 2 * FAKE_HEIGHT);
        assert_eq!(compositor.frame().stride(), 2 * FAKE_WIDTH as usize);
        for row in 0..frame.height() as usize {
            for col in 0..frame.width() as usize {
                let quadrant =
                    (row / FAKE_HEIGHT as usize) * 2 + col / FAKE_WIDTH as usize;
                let px = frame.pixels()[row * frame.stride() + col];
                assert_eq!(px, FILL_COLORS[quadrant], "row {row} col {col}");
            }
        }
    }

    #[test]
    fn padding_columns_never_reach_the_output() {
        // Source rows are stride-padded with the fill complement; none of
        // that may appear in the packed output.
        let (frame, _) = composed(2);
        for &px in frame.pixels() {
            assert!(
                FILL_COLORS.contains(&px),
                "padding pixel {px:#06x} leaked into output"
            );
        }
    }

    #[test]
    fn compose_overwrites_previous_tick() {
        let factory = FakeFactory::new();
        let mut set = InstanceSet::create(&factory, &[1; 16], 1).expect("load");
        let dims = set.first().core().video_dimensions();
        let mut compositor = VideoCompositor::new(LayoutPolicy::Single, dims, FAKE_STRIDE);
        compositor.compose(&set);
        let before = compositor.frame().pixels().to_vec();
        set.first_mut().core_mut().run_frame();
        compositor.compose(&set);
        // Same fill color either way; the buffer is rewritten in place.
        assert_eq!(before, compositor.frame().pixels());
    }
}
