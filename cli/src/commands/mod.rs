//! Command implementations

pub mod create_site;
pub mod first_sync;
pub mod just_launched;
pub mod kinsta_prep;
pub mod style_guide;
pub mod sync;
pub mod version;
