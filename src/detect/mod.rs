mod backend;
mod backends;
mod classes;
mod registry;
mod result;
pub mod yolo;

pub use backend::{
    Detector, ModelAssets, DEFAULT_CLASSES_PATH, DEFAULT_INPUT_SIZE, DEFAULT_NETWORK_CONFIG_PATH,
    DEFAULT_WEIGHTS_PATH,
};
#[cfg(feature = "backend-opencv")]
pub use backends::DarknetBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{DisabledBackend, StubBackend};
pub use classes::ClassVocabulary;
pub use registry::{load_detector, BackendKind};
pub use result::Detection;
