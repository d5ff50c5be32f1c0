pub mod hmm;
pub use hmm::*;

pub mod likelihood;
pub use likelihood::*;

pub mod baumwelch;
pub use baumwelch::*;

pub mod sample;
pub use sample::*;
