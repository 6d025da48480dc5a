pub mod ask;
pub mod country;
pub mod lookup;
pub mod status;

// Re-export command functions for convenience
pub use ask::ask;
pub use country::{countries, country};
pub use lookup::{conflicts, factbook, news, worldbank};
pub use status::status;
