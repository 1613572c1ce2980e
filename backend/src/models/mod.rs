// src/models/mod.rs

pub mod exam_room;
pub mod question;
pub mod submission;
pub mod user;
