//! Domain models for the clinic core.

mod audit;
mod diet;
mod invite;
mod practitioner;
mod vitals;

pub use audit::*;
pub use diet::*;
pub use invite::*;
pub use practitioner::*;
pub use vitals::*;
