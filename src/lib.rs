pub mod assemble;
pub mod decode;
pub mod errors;
pub mod format;
pub mod models;
pub mod reader;
pub mod services;
