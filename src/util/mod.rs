pub mod rewrite;
pub mod timefmt;
