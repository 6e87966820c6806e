pub mod request;
pub mod schema;
pub mod source;
pub mod value;
