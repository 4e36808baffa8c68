// Application layer - Use case interactors

pub mod container;
pub mod inspect_interactor;
pub mod process_interactor;

// Re-export interactors
pub use container::{AppContainer, AppContext};
pub use inspect_interactor::InspectInteractor;
pub use process_interactor::ProcessInteractor;
