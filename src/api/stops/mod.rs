pub mod departures;
pub mod favorite;
pub mod filters;
pub mod list;
