/// An axis-aligned pixel rectangle inside an atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// The rectangle grown by `border` on its right and bottom edges, which
    /// is the space it reserves during placement.
    pub fn padded(&self, border: u32) -> Rect {
        Rect::new(self.x, self.y, self.width + border, self.height + border)
    }

    /// Check if this rectangle intersects with another
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Check if this rectangle lies within a `side`×`side` square at the origin
    pub fn fits_in(&self, side: u32) -> bool {
        self.right() <= side && self.bottom() <= side
    }
}
