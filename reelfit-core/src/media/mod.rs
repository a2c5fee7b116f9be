//! Media inspection: probing clips and resolving their display orientation.

pub mod orientation;
pub mod probe;

pub use orientation::{Orientation, resolve_orientation};
pub use probe::{ClipInput, FfprobeProber, MediaProber, ProbeData, parse_probe_output, probe_clip};
