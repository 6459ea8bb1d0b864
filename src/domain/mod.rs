// Domain layer: deletion models and the store ports the orchestrator calls.

pub mod model;
pub mod ports;
