pub mod config;
pub mod departures;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod merge;
pub mod output;
pub mod parser;
pub mod query;
pub mod stops;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
