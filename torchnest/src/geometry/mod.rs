pub mod convex_hull;
pub mod geo_traits;
pub mod nfp;
pub mod primitives;
