// src/models/mod.rs

pub mod authored;
pub mod catalog;
pub mod comment;
pub mod review;
pub mod title;
pub mod user;
