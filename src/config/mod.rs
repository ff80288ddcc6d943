//! Configuration management for LogShip

pub mod options;

pub use options::{
    merge, BufferConfig, ClientOptions, FlusherConfig, FormatterConfig, ResolvedTopology,
};
