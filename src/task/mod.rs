mod lenient;
pub mod models;

pub use models::{BittorrentInfo, BittorrentName, Task, TaskFile, TaskStatus, TaskUri};
