//! Small numerical utilities shared by the options math layer.

pub mod normal;
pub mod root_find;

pub use normal::{norm_cdf, norm_pdf};
pub use root_find::{newton_bisection, RootFindError};
