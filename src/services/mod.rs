//! Build, storage and assistant services

pub mod ai_service;
pub mod build_service;
pub mod sketch_store;
pub mod staging;
pub mod toolchain;

pub use ai_service::OllamaClient;
pub use build_service::BuildOrchestrator;
pub use sketch_store::SketchStore;
pub use staging::{StagingManager, StagingWorkspace};
pub use toolchain::{ArduinoCli, Invocation, ToolchainInvoker};
