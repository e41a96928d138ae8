use crate::gpu::TextureId;

/// Which texture each unit holds, with round-robin replacement.
#[derive(Debug, Clone)]
pub struct TextureUnitTable {
    units: Vec<Option<TextureId>>,
    last: usize,
    current: usize,
}

impl TextureUnitTable {
    pub fn new(count: usize) -> Self {
        Self {
            units: vec![None; count.max(1)],
            last: 0,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit that draws sample from
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_texture(&self) -> Option<TextureId> {
        self.units[self.current]
    }

    pub fn texture(&self, unit: usize) -> Option<TextureId> {
        self.units.get(unit).copied().flatten()
    }

    /// Make `texture` current. Returns the unit and whether the texture
    /// still has to be bound to it.
    pub fn bind(&mut self, texture: TextureId) -> (usize, bool) {
        if let Some(unit) = self.units.iter().position(|&t| t == Some(texture)) {
            self.current = unit;
            return (unit, false);
        }
        let unit = self.last;
        self.units[unit] = Some(texture);
        self.current = unit;
        self.last = (self.last + 1) % self.units.len();
        (unit, true)
    }

    pub fn unbind(&mut self, unit: usize) {
        if let Some(slot) = self.units.get_mut(unit) {
            *slot = None;
        }
    }

    /// Forget every binding, e.g. after the textures were deleted
    pub fn clear(&mut self) {
        self.units.fill(None);
        self.last = 0;
        self.current = 0;
    }
}
