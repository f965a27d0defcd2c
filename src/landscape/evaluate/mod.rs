pub mod rank;
pub mod counts;
pub mod graph;
