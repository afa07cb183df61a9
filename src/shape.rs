/// The current bucket width, tracked as a small tagged variant rather than
/// runtime function pointers so `add`/`has`/`del` collapse to a single match
/// per call instead of branching inside the hot per-slot loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Two,
    Three,
    Four,
}

impl Shape {
    pub(crate) fn width(self) -> usize {
        match self {
            Shape::Two => 2,
            Shape::Three => 3,
            Shape::Four => 4,
        }
    }

    /// The next wider shape, or `None` once already at the widest (4), at
    /// which point the only remaining move is [`crate::buckets::BucketArray::grow`].
    pub(crate) fn widen(self) -> Option<Shape> {
        match self {
            Shape::Two => Some(Shape::Three),
            Shape::Three => Some(Shape::Four),
            Shape::Four => None,
        }
    }
}
