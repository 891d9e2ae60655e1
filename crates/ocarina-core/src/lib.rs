pub mod app;
pub mod driver;
pub mod ipc;

pub use app::*;
pub use driver::*;
pub use ipc::*;
