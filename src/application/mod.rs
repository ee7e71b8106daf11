pub mod accounts;
pub mod bootstrap;
pub mod catalog;
pub mod endpoint;
pub mod playback;
pub mod progress;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
