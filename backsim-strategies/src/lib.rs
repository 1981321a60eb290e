//! Reference strategy implementations against `backsim_core::kernel::Strategy`.

pub mod covered_call;

pub use covered_call::CoveredCall;
