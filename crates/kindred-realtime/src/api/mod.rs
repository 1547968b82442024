//! REST collaborators

mod devices;

pub use devices::RestDeviceApi;
