//! Core module containing the main functionality of wsterm
//!
//! This module provides:
//! - Transport layer for frame-based connections (WebSocket)
//! - Line buffer for reassembling lines split across frames
//! - Framed-to-line adapter with timeout and silence based reads
//! - Console helpers for command-line devices
//! - Scripted device simulation
//! - Session capture logging

pub mod adapter;
pub mod buffer;
pub mod console;
pub mod logger;
pub mod simulator;
pub mod transport;
