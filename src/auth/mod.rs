//! A set of basic auth flavors specified in RFC 5531.

mod flavor;
mod unix_params;

pub use flavor::*;
pub use unix_params::*;
