//! Picking and selection types.

use glam::Vec3;

/// Result of a pick on the pickable overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    /// The name of the structure that was picked.
    pub structure_name: String,

    /// The index of the picked detector within the current subset.
    pub element_index: usize,

    /// The world position of the pick point.
    pub world_position: Vec3,
}

impl PickResult {
    /// Creates a new pick result.
    pub fn new(
        structure_name: impl Into<String>,
        element_index: usize,
        world_position: Vec3,
    ) -> Self {
        Self {
            structure_name: structure_name.into(),
            element_index,
            world_position,
        }
    }
}

/// Trait for objects that support picking/selection.
pub trait Pickable {
    /// Encodes an element index into an RGBA pick color.
    fn encode_pick_color(&self, element_index: usize) -> [u8; 4];

    /// Decodes a pick color back to an element index.
    fn decode_pick_color(&self, color: [u8; 4]) -> Option<usize>;

    /// Returns the total number of pickable elements.
    fn num_pickable_elements(&self) -> usize;
}

/// Packs an index into the RGB channels (R = bits 16-23, G = 8-15, B = 0-7).
///
/// Alpha is always 255 so that background pixels (alpha 0) decode to nothing.
#[must_use]
pub fn index_to_color(index: u32) -> [u8; 4] {
    let [_, r, g, b] = index.to_be_bytes();
    [r, g, b, 255]
}

/// Inverse of [`index_to_color`]. Returns `None` for background pixels.
#[must_use]
pub fn color_to_index(color: [u8; 4]) -> Option<u32> {
    let [r, g, b, a] = color;
    (a != 0).then(|| (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
}
