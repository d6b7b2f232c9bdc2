//! Price simulations
//!
//! - **Monte Carlo**: compounded normal returns, paths generated in parallel
//! - **DCA**: fixed monthly purchases compared with a lump sum

pub mod dca;
pub mod monte_carlo;

pub use dca::*;
pub use monte_carlo::*;
