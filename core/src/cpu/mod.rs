pub mod state;
pub use state::{CpuStateTrait, Mcs51State};

pub mod mcs51;
pub use mcs51::Mcs51;
