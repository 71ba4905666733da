//! # Tracker Cache
//!
//! The bounded, time-limited local record cache and the component that
//! answers resolve requests from it, falling back to the backing store on
//! a miss.

mod handler;
mod local;
mod resolver;

pub use handler::*;
pub use local::*;
pub use resolver::*;
