// Domain layer: canonical drawing-feature model and ports (interfaces).

pub mod model;
pub mod ports;
