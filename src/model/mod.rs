pub mod api;
pub mod ballot;
pub mod chain;
pub mod token;
pub mod transport;

pub use ballot::Ballot;
pub use token::Token;
