pub mod archive;
pub mod client;
pub mod rainfall_page;

pub use archive::extract_csv;
pub use client::RemoteClient;
pub use rainfall_page::find_archive_link;
