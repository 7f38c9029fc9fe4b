//! Signal Simulation Library
//!
//! A headless traffic intersection simulation with adaptive and
//! learning-based signal control.

pub mod simulation;
