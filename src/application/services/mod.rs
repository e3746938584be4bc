pub mod comment_service;

pub mod fetcher;

pub mod web_info_service;
