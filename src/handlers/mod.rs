pub mod download;
pub mod info;

pub use download::handle_download;
pub use info::handle_info;
