pub mod actor;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod models;
pub mod reconciler;

pub use actor::{TaskStore, TaskStoreHandle};
pub use dispatcher::{CommandDispatcher, combine_poll};
pub use error::HistoryError;
pub use history::HistoryStore;
pub use models::{
    CommandKind, PollOutcome, StoreCommand, StoreEvent, StoreTimings, TaskOptions, TaskView,
};
pub use reconciler::{TaskReconciler, compose_view, merge_fetched};
