//! Firework show simulation. The `pyroshow` binary draws it in a terminal.

pub mod catalog;
pub mod color;
pub mod config;
pub mod context;
pub mod effect;
pub mod particle;
pub mod pool;
pub mod scene;
pub mod sequencer;
pub mod shell;
pub mod show;
pub mod sky;
pub mod timeline;

pub use catalog::ShellType;
pub use color::{Color, ShellColor};
pub use config::{ConfigError, ConfigResult, Quality, ShowConfig, SkyLighting};
pub use context::{SimContext, Stage};
pub use particle::{BurstFlash, Spark, Star};
pub use pool::{Handle, ParticlePool};
pub use show::{LaunchRequest, Show};
