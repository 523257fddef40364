//! # vf-av
//!
//! The media codec tool: everything that shells out to ffmpeg/ffprobe.
//!
//! This crate provides:
//!
//! - **Codec abstraction** ([`MediaCodec`]) -- the blocking-in-spirit
//!   operations the worker pool invokes: thumbnail + dimensions, audio
//!   extraction, resize. Tests substitute their own implementations.
//! - **ffmpeg implementation** ([`FfmpegCodec`]).
//! - **Tool discovery** ([`ToolRegistry`]) -- resolve ffmpeg and ffprobe
//!   once at startup.
//! - **Command execution** ([`ToolCommand`]) -- one child process with a
//!   deadline, killed when dropped.

pub mod codec;
pub mod command;
pub mod ffmpeg;
pub mod tools;

pub use codec::MediaCodec;
pub use command::ToolCommand;
pub use ffmpeg::FfmpegCodec;
pub use tools::{Tool, ToolRegistry, ToolStatus};
