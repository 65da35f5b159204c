// Domain layer: records and the ports the services talk through. No I/O here.

pub mod model;
pub mod ports;
