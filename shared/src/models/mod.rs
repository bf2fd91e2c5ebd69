pub mod card;
pub mod knowledge;
mod lenient;
pub mod lorebook;
pub mod options;
pub mod preview;
pub mod requests;
pub mod settings;

pub use card::*;
pub use knowledge::*;
pub use lorebook::*;
pub use options::*;
pub use preview::*;
pub use requests::*;
pub use settings::*;
