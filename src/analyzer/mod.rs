//! Analysis engine for determining version bumps from commits

pub mod increment_finder;

pub use increment_finder::IncrementStrategyFinder;
