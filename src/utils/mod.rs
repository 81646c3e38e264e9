//! Utility modules

mod data_loader;

pub use data_loader::{DataLoader, DatasetFormat};
