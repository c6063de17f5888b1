mod asset_handle;
mod command_handle;
mod update_handle;

pub use asset_handle::*;
pub use command_handle::*;
pub use update_handle::*;
