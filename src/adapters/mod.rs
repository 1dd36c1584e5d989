// Adapters layer: concrete implementations for external systems (design-data service, imagery).

pub mod http;
pub mod render;
