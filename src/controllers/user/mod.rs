pub mod bookmark;
pub mod history;
pub mod profile;
