//! Placement engines: greedy bottom-left fill, its polygon-aware variant
//! and the genetic ordering search layered on top.

mod blf;
mod genetic;
mod nfp_nest;

#[doc(inline)]
pub use blf::BlfNester;
#[doc(inline)]
pub use genetic::{GeneticConfig, GeneticNester, solution_fitness};
#[doc(inline)]
pub use nfp_nest::NfpNester;
