mod media;
mod visit;
mod webhook;

pub use media::*;
pub use visit::*;
pub use webhook::*;
