pub mod book;
pub mod commands;
pub mod errors;
pub mod events;
pub mod loan;
pub mod policy;
pub mod user;
pub mod value_objects;

pub use errors::*;
pub use events::*;
pub use value_objects::*;
