pub mod cell;
pub mod grid;
pub mod health;
pub mod diagnostics;
pub mod messages;
pub mod error;

pub use cell::*;
pub use grid::*;
pub use health::*;
pub use diagnostics::*;
pub use messages::*;
pub use error::*;
