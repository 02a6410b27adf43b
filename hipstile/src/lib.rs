//! HiPS tile engine.
//!
//! Addresses HEALPix tiles, parses survey metadata, keeps decoded tiles in a
//! budgeted cache, loads them asynchronously and picks which tiles to draw
//! for a view.
//!
//! The usual entry point is [`survey::Survey`]: create one per survey URL
//! with a shared [`loader::TileLoader`], then call
//! [`Survey::render`](survey::Survey::render) each frame.

pub mod cache;
pub mod config;
pub mod decode;
pub mod healpix;
pub mod layer;
pub mod loader;
pub mod lod;
pub mod logging;
pub mod properties;
pub mod survey;
pub mod telemetry;
pub mod transport;
