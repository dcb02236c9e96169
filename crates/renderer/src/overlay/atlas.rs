//! CPU side of the overlay text: a shelf-packed R8 glyph atlas and the quad
//! instances that sample it.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

/// Transparent gap kept around every packed region.
pub const GLYPH_PADDING: u32 = 1;
/// Side of the opaque block reserved for untextured quads.
const SOLID_BLOCK: u32 = 2;

/// Normalised texture coordinates of a packed region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasRegion {
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

/// Square single-channel coverage atlas.
///
/// Regions are placed left to right on shelves; a new shelf starts below the
/// tallest region of the current one. The top-left corner holds a small fully
/// covered block so solid quads can share the text pipeline.
pub struct GlyphAtlas {
    size: u32,
    pixels: Vec<u8>,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    glyphs: HashMap<char, AtlasRegion>,
    solid: AtlasRegion,
    dirty: bool,
}

impl GlyphAtlas {
    pub fn new(size: u32) -> Self {
        let mut pixels = vec![0u8; (size * size) as usize];
        for y in GLYPH_PADDING..GLYPH_PADDING + SOLID_BLOCK {
            let row = (y * size) as usize;
            let start = row + GLYPH_PADDING as usize;
            pixels[start..start + SOLID_BLOCK as usize].fill(u8::MAX);
        }
        // Sample the centre of the block so linear filtering never reaches the padding.
        let centre = (GLYPH_PADDING + SOLID_BLOCK / 2) as f32 / size as f32;
        Self {
            size,
            pixels,
            cursor_x: GLYPH_PADDING + SOLID_BLOCK + GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: SOLID_BLOCK,
            glyphs: HashMap::new(),
            solid: AtlasRegion {
                uv_min: [centre, centre],
                uv_max: [centre, centre],
            },
            dirty: true,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn solid(&self) -> AtlasRegion {
        self.solid
    }

    pub fn get(&self, ch: char) -> Option<AtlasRegion> {
        self.glyphs.get(&ch).copied()
    }

    /// Copies a `width`×`height` coverage bitmap into the atlas.
    ///
    /// Returns `None` when the bitmap is empty or malformed, or when no space
    /// is left.
    pub fn insert(
        &mut self,
        ch: char,
        width: u32,
        height: u32,
        bitmap: &[u8],
    ) -> Option<AtlasRegion> {
        if width == 0 || height == 0 || bitmap.len() != (width * height) as usize {
            return None;
        }
        let (x, y) = self.allocate(width, height)?;

        for row in 0..height {
            let src = (row * width) as usize;
            let dst = ((y + row) * self.size + x) as usize;
            self.pixels[dst..dst + width as usize]
                .copy_from_slice(&bitmap[src..src + width as usize]);
        }

        let atlas = self.size as f32;
        let region = AtlasRegion {
            uv_min: [x as f32 / atlas, y as f32 / atlas],
            uv_max: [(x + width) as f32 / atlas, (y + height) as f32 / atlas],
        };
        self.glyphs.insert(ch, region);
        self.dirty = true;
        Some(region)
    }

    /// Whether pixels changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn allocate(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width + 2 * GLYPH_PADDING > self.size {
            return None;
        }
        let (mut x, mut y, mut row_height) = (self.cursor_x, self.cursor_y, self.row_height);
        if x + width + GLYPH_PADDING > self.size {
            x = GLYPH_PADDING;
            y += row_height + GLYPH_PADDING;
            row_height = 0;
        }
        if y + height + GLYPH_PADDING > self.size {
            return None;
        }
        self.cursor_x = x + width + GLYPH_PADDING;
        self.cursor_y = y;
        self.row_height = row_height.max(height);
        Some((x, y))
    }
}

/// One laid-out glyph, relative to the top-left of the text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Per-instance vertex data for one textured screen-space quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadInstance {
    pub dst_min: [f32; 2],
    pub dst_max: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub color: [f32; 4],
}

impl QuadInstance {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2,
        2 => Float32x2,
        3 => Float32x2,
        4 => Float32x2,
        5 => Float32x4
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Panel placement and colours for [`build_instances`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelStyle {
    pub origin: [f32; 2],
    pub padding: f32,
    pub line_height: f32,
    pub background: [f32; 4],
    pub foreground: [f32; 4],
}

/// Builds the background panel followed by one quad per glyph.
///
/// The panel hugs the text plus `padding` on each side and is never shorter
/// than one line. Glyphs missing from the atlas are skipped.
pub fn build_instances(
    glyphs: &[PlacedGlyph],
    atlas: &GlyphAtlas,
    style: &PanelStyle,
) -> Vec<QuadInstance> {
    let text_min = [style.origin[0] + style.padding, style.origin[1] + style.padding];

    let mut right: f32 = 0.0;
    let mut bottom = style.line_height;
    let mut quads = Vec::with_capacity(glyphs.len());
    for glyph in glyphs {
        let Some(region) = atlas.get(glyph.ch) else {
            continue;
        };
        right = right.max(glyph.x + glyph.width);
        bottom = bottom.max(glyph.y + glyph.height);
        let dst_min = [text_min[0] + glyph.x, text_min[1] + glyph.y];
        quads.push(QuadInstance {
            dst_min,
            dst_max: [dst_min[0] + glyph.width, dst_min[1] + glyph.height],
            uv_min: region.uv_min,
            uv_max: region.uv_max,
            color: style.foreground,
        });
    }

    let solid = atlas.solid();
    let panel = QuadInstance {
        dst_min: style.origin,
        dst_max: [
            text_min[0] + right + style.padding,
            text_min[1] + bottom + style.padding,
        ],
        uv_min: solid.uv_min,
        uv_max: solid.uv_max,
        color: style.background,
    };

    let mut instances = Vec::with_capacity(quads.len() + 1);
    instances.push(panel);
    instances.extend(quads);
    instances
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLE: PanelStyle = PanelStyle {
        origin: [8.0, 8.0],
        padding: 6.0,
        line_height: 20.0,
        background: [0.0, 0.0, 0.0, 0.6],
        foreground: [1.0, 1.0, 1.0, 1.0],
    };

    fn bitmap(width: u32, height: u32, value: u8) -> Vec<u8> {
        vec![value; (width * height) as usize]
    }

    #[test]
    fn solid_block_is_fully_covered() {
        let atlas = GlyphAtlas::new(64);
        let solid = atlas.solid();
        let x = (solid.uv_min[0] * 64.0) as usize;
        let y = (solid.uv_min[1] * 64.0) as usize;
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert_eq!(atlas.pixels()[(y - 1 + dy) * 64 + x - 1 + dx], u8::MAX);
        }
        assert_eq!(atlas.pixels()[0], 0);
    }

    #[test]
    fn glyphs_pack_left_to_right_with_padding() {
        let mut atlas = GlyphAtlas::new(64);
        let first = atlas.insert('1', 4, 6, &bitmap(4, 6, 9)).unwrap();
        let second = atlas.insert('2', 4, 6, &bitmap(4, 6, 7)).unwrap();

        assert_eq!(first.uv_min, [4.0 / 64.0, 1.0 / 64.0]);
        assert_eq!(first.uv_max, [8.0 / 64.0, 7.0 / 64.0]);
        assert_eq!(second.uv_min[0], 9.0 / 64.0);
        assert_eq!(second.uv_min[1], first.uv_min[1]);

        assert_eq!(atlas.pixels()[64 + 4], 9);
        assert_eq!(atlas.pixels()[64 + 8], 0);
        assert_eq!(atlas.pixels()[64 + 9], 7);
        assert_eq!(atlas.get('2'), Some(second));
    }

    #[test]
    fn full_row_wraps_to_next_shelf() {
        let mut atlas = GlyphAtlas::new(32);
        let tall = atlas.insert('a', 10, 8, &bitmap(10, 8, 1)).unwrap();
        atlas.insert('b', 10, 4, &bitmap(10, 4, 1)).unwrap();
        let wrapped = atlas.insert('c', 10, 4, &bitmap(10, 4, 1)).unwrap();

        assert_eq!(wrapped.uv_min[0], 1.0 / 32.0);
        assert_eq!(wrapped.uv_min[1], tall.uv_max[1] + 1.0 / 32.0);
    }

    #[test]
    fn full_atlas_rejects_glyph_without_losing_space() {
        let mut atlas = GlyphAtlas::new(16);
        assert!(atlas.insert('x', 14, 14, &bitmap(14, 14, 1)).is_none());
        assert!(atlas.insert('y', 12, 12, &bitmap(12, 12, 1)).is_none());
        assert!(atlas.insert('z', 6, 6, &bitmap(6, 6, 1)).is_some());
        assert!(atlas.insert('w', 6, 10, &bitmap(6, 10, 1)).is_none());
        assert_eq!(atlas.get('w'), None);
    }

    #[test]
    fn malformed_bitmaps_are_rejected() {
        let mut atlas = GlyphAtlas::new(32);
        assert!(atlas.insert(' ', 0, 5, &[]).is_none());
        assert!(atlas.insert('q', 3, 3, &bitmap(2, 2, 1)).is_none());
    }

    #[test]
    fn uvs_stay_inside_unit_square() {
        let mut atlas = GlyphAtlas::new(64);
        let mut regions = Vec::new();
        for (index, ch) in "0123456789.FPS".chars().enumerate() {
            let width = 5 + index as u32 % 4;
            if let Some(region) = atlas.insert(ch, width, 12, &bitmap(width, 12, 3)) {
                regions.push(region);
            }
        }
        assert_eq!(regions.len(), 14);
        for region in regions {
            for uv in region.uv_min.into_iter().chain(region.uv_max) {
                assert!((0.0..=1.0).contains(&uv));
            }
            assert!(region.uv_min[0] < region.uv_max[0]);
            assert!(region.uv_min[1] < region.uv_max[1]);
        }
    }

    #[test]
    fn dirty_flag_clears_after_take() {
        let mut atlas = GlyphAtlas::new(32);
        assert!(atlas.take_dirty());
        assert!(!atlas.take_dirty());
        atlas.insert('1', 2, 2, &bitmap(2, 2, 1)).unwrap();
        assert!(atlas.take_dirty());
    }

    #[test]
    fn panel_precedes_glyphs_and_encloses_them() {
        let mut atlas = GlyphAtlas::new(64);
        atlas.insert('6', 8, 12, &bitmap(8, 12, 1)).unwrap();
        atlas.insert('0', 8, 12, &bitmap(8, 12, 1)).unwrap();
        let placed = [
            PlacedGlyph { ch: '6', x: 0.0, y: 4.0, width: 8.0, height: 12.0 },
            PlacedGlyph { ch: '0', x: 10.0, y: 4.0, width: 8.0, height: 12.0 },
        ];

        let instances = build_instances(&placed, &atlas, &STYLE);
        assert_eq!(instances.len(), 3);

        let panel = instances[0];
        assert_eq!(panel.dst_min, [8.0, 8.0]);
        assert_eq!(panel.dst_max, [8.0 + 6.0 + 18.0 + 6.0, 8.0 + 6.0 + 20.0 + 6.0]);
        assert_eq!(panel.uv_min, atlas.solid().uv_min);
        assert_eq!(panel.color, STYLE.background);

        assert_eq!(instances[1].dst_min, [14.0, 18.0]);
        assert_eq!(instances[2].dst_min, [24.0, 18.0]);
        assert_eq!(instances[2].dst_max, [32.0, 30.0]);
        assert_eq!(instances[2].uv_min, atlas.get('0').unwrap().uv_min);
        for glyph in &instances[1..] {
            assert!(glyph.dst_max[0] <= panel.dst_max[0]);
            assert!(glyph.dst_max[1] <= panel.dst_max[1]);
        }
    }

    #[test]
    fn glyphs_missing_from_atlas_are_skipped() {
        let atlas = GlyphAtlas::new(32);
        let placed = [PlacedGlyph { ch: '7', x: 0.0, y: 0.0, width: 5.0, height: 5.0 }];
        let instances = build_instances(&placed, &atlas, &STYLE);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].dst_max, [8.0 + 12.0, 8.0 + 12.0 + 20.0]);
    }
}
