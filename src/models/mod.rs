// Data models for Pinterest API responses

pub mod pinterest;

pub use pinterest::{Board, BoardsPage, Pin, PinsPage, UserAccount};
