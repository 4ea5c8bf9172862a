//! Shared substrate for flux2_rs: the latent and schedule buffer types
//! exchanged with backend implementations, and the phase-observer seam.

mod latent;
mod phase;
mod schedule;

pub use latent::{Latent, LATENT_CHANNELS};
pub use phase::{NoopPhaseObserver, PhaseObserver, TracingPhaseObserver};
pub use schedule::Schedule;
