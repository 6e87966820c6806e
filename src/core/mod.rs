pub mod gateway;
pub mod inference;
pub mod predicate;
pub mod schema_builder;
pub mod statement;
