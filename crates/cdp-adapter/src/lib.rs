//! Browser providers for the Twizz UI interaction layer.
//!
//! [`InMemoryPage`] is a scripted document for tests and dry runs. The
//! `chromium` feature adds [`ChromiumPage`], which drives a real tab over the
//! DevTools protocol using the in-page scripts in [`scripts`].

pub mod memory;
pub mod scripts;

#[cfg(feature = "chromium")]
pub mod chromium;

pub use memory::{ActuationRecord, ClickEffect, FakeElement, InMemoryPage};

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumPage, LaunchOptions};
