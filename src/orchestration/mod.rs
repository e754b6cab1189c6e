pub mod processor;
pub mod registry;

pub use processor::SignalProcessor;
pub use registry::{BatchDetail, BatchRegistry, BatchUpdate, NewBatch, RegistryError};
