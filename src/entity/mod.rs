pub mod extraction;
pub mod types;

pub use self::extraction::HeuristicEntityExtractor;
pub use self::types::EntityType;
