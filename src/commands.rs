pub mod build;
pub mod ls;
