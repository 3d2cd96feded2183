pub mod cache;
pub mod codes;
pub mod excel_write;
