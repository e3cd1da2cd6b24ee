pub mod activity;
pub mod journal;
pub mod media;
pub mod packing;
pub mod stats;
pub mod trip;
pub mod user;
