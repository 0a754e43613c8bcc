//! Creative handling: size presets, asset detection, tag transformation,
//! placeholder consolidation, and creative dispatch.

pub mod assets;
pub mod consolidate;
pub mod dispatcher;
pub mod presets;
pub mod tags;

pub use assets::{AssetFile, AssetKind};
pub use consolidate::SizeGroupConsolidator;
pub use dispatcher::{CreativeContext, CreativeTagDispatcher};
pub use tags::{TagPayload, TagRow, TagTable};
