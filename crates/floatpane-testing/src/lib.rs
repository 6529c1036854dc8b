//! Testing utilities for Floatpane.
//!
//! Fake collaborators (recording media engine and presentation), a scripted
//! host world that drives the lifecycle registry in realistic navigation
//! order, and a pointer script for exercising the gesture recognizer with
//! fully controlled timestamps.

pub mod fakes;
pub mod hosts;
pub mod script;

pub use fakes::{BuiltWindow, EngineCall, OverlayHarness, RecordingEngine, RecordingPresentation};
pub use hosts::HostWorld;
pub use script::{GestureEvent, GestureScript, RecordingHandler};
