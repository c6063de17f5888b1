mod settings;

pub use settings::{Assets, Logger, Server, Settings, Update};
