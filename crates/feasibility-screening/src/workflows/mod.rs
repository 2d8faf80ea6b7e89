pub mod import;
pub mod screening;
