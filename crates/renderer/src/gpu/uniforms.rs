use crate::interface::{BlockLayout, UniformLocation, UniformType};

/// CPU-side copy of the host uniform block, laid out per the reflected
/// std140 offsets and uploaded whole each frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformBlock {
    binding: u32,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: &BlockLayout) -> Self {
        Self {
            binding: layout.binding,
            data: vec![0; layout.size as usize],
        }
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn set_float(&mut self, location: UniformLocation, value: f32) {
        self.write(location, UniformType::Float, bytemuck::bytes_of(&value));
    }

    pub fn set_vec2(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.write(location, UniformType::Vec2, bytemuck::bytes_of(&value));
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn write(&mut self, location: UniformLocation, expected: UniformType, bytes: &[u8]) {
        let UniformLocation::Bound { offset, ty } = location else {
            return;
        };
        if ty != expected {
            return;
        }
        let start = offset as usize;
        let Some(slot) = self.data.get_mut(start..start + ty.size()) else {
            tracing::warn!(offset, size = ty.size(), "uniform write outside block; ignored");
            return;
        };
        slot.copy_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::BlockMember;

    fn layout() -> BlockLayout {
        BlockLayout {
            binding: 0,
            size: 16,
            members: vec![
                BlockMember {
                    name: Some("iResolution".into()),
                    offset: 0,
                    ty: Some(UniformType::Vec2),
                },
                BlockMember {
                    name: Some("iTime".into()),
                    offset: 8,
                    ty: Some(UniformType::Float),
                },
            ],
        }
    }

    fn read_f32(block: &UniformBlock, offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&block.as_bytes()[offset..offset + 4])
    }

    #[test]
    fn writes_land_at_reflected_offsets() {
        let mut block = UniformBlock::new(&layout());
        block.set_vec2(
            UniformLocation::Bound {
                offset: 0,
                ty: UniformType::Vec2,
            },
            [800.0, 600.0],
        );
        block.set_float(
            UniformLocation::Bound {
                offset: 8,
                ty: UniformType::Float,
            },
            1.25,
        );

        assert_eq!(block.as_bytes().len(), 16);
        assert_eq!(read_f32(&block, 0), 800.0);
        assert_eq!(read_f32(&block, 4), 600.0);
        assert_eq!(read_f32(&block, 8), 1.25);
    }

    #[test]
    fn unused_location_is_a_no_op() {
        let mut block = UniformBlock::new(&layout());
        block.set_float(UniformLocation::Unused, 3.0);
        block.set_vec2(UniformLocation::Unused, [1.0, 2.0]);
        assert!(block.as_bytes().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn mismatched_type_is_ignored() {
        let mut block = UniformBlock::new(&layout());
        block.set_float(
            UniformLocation::Bound {
                offset: 0,
                ty: UniformType::Vec2,
            },
            9.0,
        );
        assert!(block.as_bytes().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn out_of_range_write_is_ignored() {
        let mut block = UniformBlock::new(&layout());
        block.set_vec2(
            UniformLocation::Bound {
                offset: 12,
                ty: UniformType::Vec2,
            },
            [1.0, 1.0],
        );
        assert!(block.as_bytes().iter().all(|byte| *byte == 0));
    }
}
