//! Tax module containing GST line math and bill totals

pub mod gst;

pub use gst::*;
