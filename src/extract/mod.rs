//! C5 ArticleExtractor and C6 ImageSelector: turn fetched HTML into a
//! title, description, structured body text, and ranked image URLs.

pub mod article;
pub mod images;
pub mod text;
