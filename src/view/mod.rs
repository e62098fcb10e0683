//! View binding: a small MVI form that shows the latest value of one event
//! and publishes what the user types.
//!
//! The displayed value changes only when the channel delivers a broadcast;
//! submitting never updates it directly.

mod binding;
pub mod mvi;
mod printer;
mod render;
mod state;
mod terminal;
mod theme;

pub use binding::ViewBinding;
pub use printer::{watch, LinePrinter};
pub use render::draw;
pub use state::{display_value, PublishStatus, ViewIntent, ViewReducer, ViewState};
pub use terminal::{key_intent, run};
