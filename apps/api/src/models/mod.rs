pub mod presentation;
pub mod template;
