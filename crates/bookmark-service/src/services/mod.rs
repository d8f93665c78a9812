pub mod bookmark_service;
pub mod member_service;
pub mod token_service;
