pub mod chart_object;
pub mod song;
pub mod timeline;
