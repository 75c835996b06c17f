mod types;

pub use types::RpoConfig;
