mod point;
mod polygon;
mod rect;

#[doc(inline)]
pub use point::Point;
#[doc(inline)]
pub use polygon::Polygon;
#[doc(inline)]
pub use polygon::shoelace_area;
#[doc(inline)]
pub use rect::Rect;
