pub mod delivery;
pub mod geocoder;
pub mod optimizer;
pub mod pricing;
pub mod routing;
pub mod simulation;
pub mod tracking;
pub mod zones;
