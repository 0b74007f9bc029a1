//! Core domain modules: the two call legs, the bridge between them, and
//! call lifecycle control.

pub mod bridge;
pub mod call_control;
pub mod realtime;
pub mod telephony;
