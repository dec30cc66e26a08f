// Domain layer - Tracking and location models
pub mod device;
pub mod location;
pub mod tracking;
