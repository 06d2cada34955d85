pub mod catalog;
pub mod composer;
