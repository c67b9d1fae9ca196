pub mod s1c88;
pub mod state;

pub use s1c88::S1C88;
pub use state::S1C88State;
