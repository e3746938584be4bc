pub mod comment;

pub mod media;
