//! SeaORM entity models
//!
//! Database entities for the Commentarium site

mod post;
mod document;
mod knowledge_entry;
mod subscriber;

pub use post::{
    Entity as PostEntity,
    Model as Post,
    ActiveModel as PostActiveModel,
    Column as PostColumn,
};

pub use document::{
    Entity as DocumentEntity,
    Model as Document,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
};

pub use knowledge_entry::Model as KnowledgeEntry;

pub use subscriber::{
    Model as Subscriber,
    ActiveModel as SubscriberActiveModel,
};
