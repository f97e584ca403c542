// Application layer - Use case interactors

pub mod batch_interactor;
pub mod container;
pub mod pipeline_interactor;

// Re-export interactors
pub use batch_interactor::{AssetOutcome, AssetStatus, BatchInteractor, BatchReport};
pub use container::{AppContainer, DefaultAppContainer, Engines};
pub use pipeline_interactor::{JobRecord, PipelineInteractor};
