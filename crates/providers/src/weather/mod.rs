//! Atmospheric providers.

pub mod meteostat;
pub mod open_meteo;

pub use meteostat::MeteostatProvider;
pub use open_meteo::OpenMeteoProvider;
