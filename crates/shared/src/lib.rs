pub mod cluster;
pub mod filter;
pub mod geo;
pub mod heat;
pub mod kdtree;
pub mod label;
pub mod markers;
pub mod models;
pub mod state;
pub mod viewport;
