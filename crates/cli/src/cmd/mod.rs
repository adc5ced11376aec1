mod discover;
mod publish;
mod remove;

pub use discover::cmd_discover;
pub use publish::cmd_publish;
pub use remove::cmd_remove;
