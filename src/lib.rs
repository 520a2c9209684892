pub mod adapters;
pub mod params;
pub mod purge;
pub mod rules;
