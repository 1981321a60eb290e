//! Options pricing: Black-Scholes price and Greeks, an implied-volatility
//! solver, a bilinear-in-variance volatility surface, and option contract
//! identity (OCC ticker parsing).

pub mod black_scholes;
pub mod contract;
pub mod implied_vol;
pub mod surface;
pub mod types;

pub use black_scholes::{bs_greeks, bs_price, put_call_parity};
pub use contract::{OptionContract, OptionType};
pub use implied_vol::implied_volatility;
pub use surface::VolSurface;
pub use types::Greeks;
