// Application layer - Tracking use cases and collaborator ports
pub mod errors;
pub mod location_ports;
pub mod request_parameters;
pub mod sample_processor;
pub mod tracking_service;

#[cfg(test)]
pub mod test_support;
