pub mod midi_import;
pub mod model;

pub use midi_import::*;
pub use model::*;
