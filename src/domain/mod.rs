// Domain layer: models and the ports the core talks to external tools through.

pub mod model;
pub mod ports;
