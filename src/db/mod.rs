use sqlx::{Postgres, Transaction};

pub mod bookmark;
pub mod comic;
pub mod error;
pub mod genre;
pub mod history;
pub mod user;

pub type PostgresTransaction = Transaction<'static, Postgres>;
