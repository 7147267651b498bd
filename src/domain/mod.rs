// Domain layer: catalog models, the DAAC registry and ports. No HTTP here.

pub mod daac;
pub mod model;
pub mod ports;
