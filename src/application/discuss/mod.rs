mod commands;
mod queries;
mod service;
pub mod types;

pub use service::{DiscussRepos, DiscussService};
pub use types::{
    CreateBoardCommand, CreateReplyCommand, CreateTopicCommand, Deleted, DiscussError,
    DiscussOptions, RefTopic, RefTopicsPage, ReindexSummary, TopicRef, UpdateBoardCommand,
    UpdateTopicCommand, ensure_non_empty,
};
