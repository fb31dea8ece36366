/// Set of functions used throughout to assure the correctness of results.
pub mod assertions;

mod cancel;
mod fpa;

#[doc(inline)]
pub use cancel::CancelToken;
#[doc(inline)]
pub use fpa::FPA;
