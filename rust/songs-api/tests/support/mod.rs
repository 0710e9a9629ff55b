pub mod harness;

pub use harness::{read_json, with_songs_harness};
