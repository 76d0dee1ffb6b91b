//! Data Transfer Objects for REST responses.

pub mod presence_dto;

pub use presence_dto::*;
