pub mod daemon;
pub mod health;
pub mod init;
pub mod link;
pub mod render;
pub mod rewrite;
pub mod upload_target;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use link::Link;
pub use render::Render;
pub use rewrite::Rewrite;
pub use upload_target::UploadTarget;
pub use version::Version;
