pub mod comments;
pub mod contact;
pub mod error;
pub mod forms;
pub mod images;
pub mod mail;
pub mod markdown;
pub mod pagination;
pub mod posts;
pub mod search;
pub mod slug;
pub mod tags;
pub mod text;

pub use error::{BlogError, ServiceResult};
