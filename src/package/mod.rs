//! Turning a cloned repository into a downloadable archive.
//!
//! - `locator`: picks the build-output folder for a project type
//! - `archiver`: zips a folder with paths relative to it

pub mod archiver;
pub mod locator;

pub use archiver::archive;
pub use locator::locate;
