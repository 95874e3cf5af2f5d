//! Partita Partial Data Model
//!
//! This crate defines the data types shared by every stage of the Partita
//! spectral modeling engine:
//!
//! - [`Breakpoint`] - instantaneous frequency, amplitude, bandwidth and phase
//! - [`Partial`] - a labeled, time-ordered breakpoint trajectory
//! - [`PartialList`] - an ordered collection of partials
//! - [`LinearEnvelope`] - a piecewise-linear control function of time
//!
//! It also provides the [`sdif`] codec used to exchange partials with other
//! tools.
//!
//! # Example
//!
//! ```
//! use partita_model::{Breakpoint, Partial};
//!
//! let mut partial = Partial::with_label(1);
//! partial.insert(0.0, Breakpoint::new(440.0, 0.5, 0.0, 0.0));
//! partial.insert(1.0, Breakpoint::new(442.0, 0.3, 0.1, 0.0));
//!
//! assert_eq!(partial.amplitude_at(0.0), 0.5);
//! assert!((partial.frequency_at(0.5) - 441.0).abs() < 1e-12);
//! ```

pub mod breakpoint;
pub mod envelope;
pub mod error;
pub mod partial;
pub mod partial_list;
pub mod sdif;

pub use breakpoint::Breakpoint;
pub use envelope::LinearEnvelope;
pub use error::{ModelError, ModelResult};
pub use partial::{wrap_phase, Breakpoints, Partial, UNLABELED};
pub use partial_list::PartialList;
