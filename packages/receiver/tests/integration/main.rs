mod common;
mod flow;
mod query;
