pub mod disabled;
pub mod stub;

#[cfg(feature = "backend-opencv")]
pub mod opencv;
#[cfg(feature = "backend-tract")]
pub mod tract;

pub use disabled::DisabledBackend;
pub use stub::StubBackend;

#[cfg(feature = "backend-opencv")]
pub use self::opencv::DarknetBackend;
#[cfg(feature = "backend-tract")]
pub use self::tract::TractBackend;
