pub mod checkpoint_fs;
pub mod http_client;

pub use checkpoint_fs::FsCheckpoint;
pub use http_client::ReqwestHttp;
